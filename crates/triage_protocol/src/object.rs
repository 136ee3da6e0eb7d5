//! The `Object` record that traverses the pipeline.

use crate::kind::{Kind, Payload};
use serde::{Deserialize, Serialize};
use std::fmt;

const ANCESTOR_INDENT: &str = "  ";

/// A tagged record flowing through producers, transformers, and sinks.
///
/// Identity is value-only: cloning an `Object` to fan it out to several
/// accepting workers is correct because no payload is ever mutated after
/// emission (invariant 5 of the data model).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Object {
    pub ttl: i64,
    pub ancestors: String,
    pub payload: Payload,
}

impl Object {
    /// Construct a freshly produced object: `ttl = start_ttl`, no ancestors.
    pub fn new(payload: Payload, start_ttl: i64) -> Self {
        Object {
            ttl: start_ttl,
            ancestors: String::new(),
            payload,
        }
    }

    pub fn kind(&self) -> Kind {
        self.payload.kind()
    }

    /// Build the child of `self` after a re-emission hop: `ttl` decremented,
    /// `ancestors` set to the stringified parent.
    pub fn reemit(&self, child_payload: Payload) -> Object {
        Object {
            ttl: self.ttl - 1,
            ancestors: self.to_string(),
            payload: child_payload,
        }
    }

    /// A terminal DeathLog wrapping `self`, per invariant 3/4 of the data model.
    pub fn into_death_log(self) -> Object {
        Object {
            ttl: 0,
            ancestors: self.to_string(),
            payload: Payload::DeathLog {
                log_data: "Object died!".to_string(),
            },
        }
    }

    pub fn is_expired(&self) -> bool {
        self.ttl < 0
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indented: String = self
            .ancestors
            .lines()
            .map(|l| format!("{ANCESTOR_INDENT}{l}\n"))
            .collect();
        write!(
            f,
            "Object Type: {}\nTTL: {}\nContent:\n{}\nAncestors:\n{}",
            self.kind(),
            self.ttl,
            self.payload.content_str(),
            indented,
        )
    }
}
