//! Scripted registry runs
//!
//! A script is a JSON array of operations applied in order to one in-memory
//! registry, so later operations see the effects of earlier ones. Each yields
//! one [`Outcome`]; a failing operation is reported and the run continues
//! with the next.

use crate::settings::CliConfig;
use anyhow::{Context, Result};
use membership_registry::{
    Clock, ErrorKind, InMemoryRoleStore, ManualClock, RegistryError, RegistryService, Role,
    SystemClock,
};
use membership_types::{MembershipId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Create {
        caller: UserId,
        users: Vec<UserId>,
        usernames: Vec<String>,
    },
    Update {
        caller: UserId,
        ids: Vec<MembershipId>,
        users: Vec<UserId>,
        usernames: Vec<String>,
        creation_timestamps: Vec<u64>,
    },
    Remove {
        caller: UserId,
        ids: Vec<MembershipId>,
    },
    Change {
        caller: UserId,
        id: MembershipId,
        username: String,
    },
    Get {
        id: MembershipId,
    },
    Lookup {
        user: UserId,
    },
    Grant {
        caller: UserId,
        role: Role,
        account: UserId,
    },
    Revoke {
        caller: UserId,
        role: Role,
        account: UserId,
    },
    Renounce {
        caller: UserId,
        role: Role,
    },
    AdvanceClock {
        secs: u64,
    },
    Snapshot,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Create { .. } => "create",
            Operation::Update { .. } => "update",
            Operation::Remove { .. } => "remove",
            Operation::Change { .. } => "change",
            Operation::Get { .. } => "get",
            Operation::Lookup { .. } => "lookup",
            Operation::Grant { .. } => "grant",
            Operation::Revoke { .. } => "revoke",
            Operation::Renounce { .. } => "renounce",
            Operation::AdvanceClock { .. } => "advance_clock",
            Operation::Snapshot => "snapshot",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    pub code: &'static str,
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&RegistryError> for ErrorReport {
    fn from(err: &RegistryError) -> Self {
        Self {
            code: err.code(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Result of one scripted operation.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub index: usize,
    pub op: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

impl Outcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

pub fn parse_script(input: &str) -> Result<Vec<Operation>> {
    serde_json::from_str(input).context("script must be a JSON array of operations")
}

pub struct ScriptRunner {
    registry: RegistryService,
    roles: Arc<InMemoryRoleStore>,
    clock: Arc<ManualClock>,
}

impl ScriptRunner {
    /// Bootstrap roles from `config` and start the clock.
    pub fn new(config: &CliConfig) -> Result<Self> {
        let roles = Arc::new(InMemoryRoleStore::new(config.admin));
        for author in &config.authors {
            roles
                .grant_role(&config.admin, Role::Author, *author)
                .with_context(|| format!("failed to grant author role to {author}"))?;
        }

        let start = config.start_time.unwrap_or_else(|| SystemClock.now_secs());
        let clock = Arc::new(ManualClock::new(start));
        let registry = RegistryService::with_clock(roles.clone(), clock.clone());
        info!(start, authors = config.authors.len(), "script runner ready");

        Ok(Self {
            registry,
            roles,
            clock,
        })
    }

    pub fn run(&self, operations: Vec<Operation>) -> Vec<Outcome> {
        operations
            .into_iter()
            .enumerate()
            .map(|(index, op)| self.apply(index, op))
            .collect()
    }

    pub fn apply(&self, index: usize, op: Operation) -> Outcome {
        let name = op.name();
        match self.execute(op) {
            Ok(result) => Outcome {
                index,
                op: name,
                result,
                error: None,
            },
            Err(err) => {
                warn!(index, op = name, code = err.code(), "operation failed: {err}");
                Outcome {
                    index,
                    op: name,
                    result: None,
                    error: Some(ErrorReport::from(&err)),
                }
            }
        }
    }

    fn execute(&self, op: Operation) -> membership_registry::Result<Option<Value>> {
        let registry = &self.registry;
        let result = match op {
            Operation::Create {
                caller,
                users,
                usernames,
            } => Some(json!(registry.create(&caller, &users, usernames.as_slice())?)),
            Operation::Update {
                caller,
                ids,
                users,
                usernames,
                creation_timestamps,
            } => {
                registry.update(
                    &caller,
                    &ids,
                    &users,
                    usernames.as_slice(),
                    &creation_timestamps,
                )?;
                None
            }
            Operation::Remove { caller, ids } => {
                registry.remove(&caller, &ids)?;
                None
            }
            Operation::Change {
                caller,
                id,
                username,
            } => {
                registry.change(&caller, id, &username)?;
                None
            }
            Operation::Get { id } => {
                let view = registry.get(id);
                let expired = !view.is_empty() && view.is_expired_at(registry.now());
                Some(json!({ "membership": view, "expired": expired }))
            }
            Operation::Lookup { user } => Some(json!(registry.lookup_by_user(&user))),
            Operation::Grant {
                caller,
                role,
                account,
            } => Some(json!(self.roles.grant_role(&caller, role, account)?)),
            Operation::Revoke {
                caller,
                role,
                account,
            } => Some(json!(self.roles.revoke_role(&caller, role, &account)?)),
            Operation::Renounce { caller, role } => {
                Some(json!(self.roles.renounce_role(&caller, role)))
            }
            Operation::AdvanceClock { secs } => Some(json!(self.clock.advance(secs))),
            Operation::Snapshot => {
                let records: Vec<Value> = registry
                    .snapshot()
                    .into_iter()
                    .map(|(id, view)| json!({ "id": id, "membership": view }))
                    .collect();
                Some(Value::Array(records))
            }
        };
        Ok(result)
    }
}
