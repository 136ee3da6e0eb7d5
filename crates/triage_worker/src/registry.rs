//! Process-wide registry: three partitioned tables (producers, transformers,
//! sinks) mapping a config-file module name to a factory. The funnel is
//! constructed directly by the lifecycle controller and can never be
//! registered here.

use std::collections::BTreeMap;
use std::collections::HashMap;

use serde_json::Value;

use crate::error::{Result, WorkerError};
use crate::module::{Producer, Sink, Transformer};

/// Reserved name no module may register under.
pub const FUNNEL_NAME: &str = "Funnel";

pub type ProducerFactory =
    Box<dyn Fn(&BTreeMap<String, Value>) -> anyhow::Result<Box<dyn Producer>> + Send + Sync>;
pub type TransformerFactory =
    Box<dyn Fn(&BTreeMap<String, Value>) -> anyhow::Result<Box<dyn Transformer>> + Send + Sync>;
pub type SinkFactory =
    Box<dyn Fn(&BTreeMap<String, Value>) -> anyhow::Result<Box<dyn Sink>> + Send + Sync>;

#[derive(Default)]
pub struct Registry {
    producers: HashMap<String, ProducerFactory>,
    transformers: HashMap<String, TransformerFactory>,
    sinks: HashMap<String, SinkFactory>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_producer(&mut self, name: &str, factory: ProducerFactory) -> Result<()> {
        reject_reserved(name)?;
        if self.producers.contains_key(name) {
            return Err(WorkerError::AlreadyRegistered(name.to_string()));
        }
        self.producers.insert(name.to_string(), factory);
        Ok(())
    }

    pub fn register_transformer(&mut self, name: &str, factory: TransformerFactory) -> Result<()> {
        reject_reserved(name)?;
        if self.transformers.contains_key(name) {
            return Err(WorkerError::AlreadyRegistered(name.to_string()));
        }
        self.transformers.insert(name.to_string(), factory);
        Ok(())
    }

    pub fn register_sink(&mut self, name: &str, factory: SinkFactory) -> Result<()> {
        reject_reserved(name)?;
        if self.sinks.contains_key(name) {
            return Err(WorkerError::AlreadyRegistered(name.to_string()));
        }
        self.sinks.insert(name.to_string(), factory);
        Ok(())
    }

    pub fn build_producer(
        &self,
        name: &str,
        args: &BTreeMap<String, Value>,
    ) -> anyhow::Result<Box<dyn Producer>> {
        let factory = self
            .producers
            .get(name)
            .ok_or_else(|| WorkerError::UnknownModule(name.to_string()))?;
        factory(args)
    }

    pub fn build_transformer(
        &self,
        name: &str,
        args: &BTreeMap<String, Value>,
    ) -> anyhow::Result<Box<dyn Transformer>> {
        let factory = self
            .transformers
            .get(name)
            .ok_or_else(|| WorkerError::UnknownModule(name.to_string()))?;
        factory(args)
    }

    pub fn build_sink(
        &self,
        name: &str,
        args: &BTreeMap<String, Value>,
    ) -> anyhow::Result<Box<dyn Sink>> {
        let factory = self
            .sinks
            .get(name)
            .ok_or_else(|| WorkerError::UnknownModule(name.to_string()))?;
        factory(args)
    }
}

fn reject_reserved(name: &str) -> Result<()> {
    if name == FUNNEL_NAME {
        Err(WorkerError::ReservedModule(name.to_string()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_funnel_registration() {
        let mut reg = Registry::new();
        let err = reg.register_producer(FUNNEL_NAME, Box::new(|_| unreachable!()));
        assert!(matches!(err, Err(WorkerError::ReservedModule(_))));
    }

    #[test]
    fn rejects_double_registration() {
        let mut reg = Registry::new();
        reg.register_sink("Log", Box::new(|_| unreachable!())).unwrap();
        let err = reg.register_sink("Log", Box::new(|_| unreachable!()));
        assert!(matches!(err, Err(WorkerError::AlreadyRegistered(_))));
    }

    #[test]
    fn unknown_module_is_error() {
        let reg = Registry::new();
        let err = reg.build_sink("Nope", &BTreeMap::new());
        assert!(err.is_err());
    }
}
