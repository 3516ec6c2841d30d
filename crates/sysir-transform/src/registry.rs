use crate::{
    config::{ConfigError, TransformConfig},
    entry_wrapper::EntryWrapperPass,
    softfloat::SoftfloatPass,
};
use indexmap::IndexMap;
use sysir_core::{FunctionPass, PassManager};

pub type PassFactory = fn(&TransformConfig) -> Box<dyn FunctionPass>;

#[derive(Clone)]
struct RegisteredPass {
    description: &'static str,
    factory: PassFactory,
}

/// Passes a pipeline can be assembled from, looked up by their registered
/// name.
#[derive(Clone, Default)]
pub struct PassRegistry {
    passes: IndexMap<String, RegisteredPass>,
}

impl PassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.passes.insert(
            "softfloat_fixup".to_string(),
            RegisteredPass {
                description: "Sysio Softfloat Fixups",
                factory: |_| Box::new(SoftfloatPass::new()),
            },
        );
        registry.passes.insert(
            "apply_fixup".to_string(),
            RegisteredPass {
                description: "Sysio Apply Fixups",
                factory: |config| Box::new(EntryWrapperPass::new(config.entry.clone())),
            },
        );
        registry
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        description: &'static str,
        factory: PassFactory,
    ) -> Result<(), ConfigError> {
        let name = name.into();
        if self.passes.contains_key(&name) {
            return Err(ConfigError::DuplicatePass(name));
        }
        self.passes.insert(
            name,
            RegisteredPass {
                description,
                factory,
            },
        );
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.passes.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.passes.keys().map(String::as_str)
    }

    pub fn description(&self, name: &str) -> Option<&'static str> {
        self.passes.get(name).map(|p| p.description)
    }

    pub fn create(
        &self,
        name: &str,
        config: &TransformConfig,
    ) -> Result<Box<dyn FunctionPass>, ConfigError> {
        let entry = self
            .passes
            .get(name)
            .ok_or_else(|| ConfigError::UnknownPass(name.to_string()))?;
        Ok((entry.factory)(config))
    }

    /// Builds a pass manager running `config.passes` in order. Fails before
    /// any pass is constructed if a name is unknown.
    pub fn build(&self, config: &TransformConfig) -> Result<PassManager, ConfigError> {
        if let Some(unknown) = config.passes.iter().find(|name| !self.contains(name)) {
            return Err(ConfigError::UnknownPass(unknown.clone()));
        }

        let mut manager = PassManager::new();
        if config.collect_statistics {
            manager.enable_statistics();
        }
        for name in &config.passes {
            manager.register_boxed(self.create(name, config)?);
        }

        tracing::debug!(passes = ?config.passes, "built pass pipeline");
        Ok(manager)
    }
}

/// Builds the pipeline described by `config` from the built-in passes.
pub fn build_pipeline(config: &TransformConfig) -> Result<PassManager, ConfigError> {
    PassRegistry::with_builtin().build(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;
    use sysir_core::{Function, SymbolTable};

    struct NopPass;

    impl FunctionPass for NopPass {
        fn name(&self) -> &'static str {
            "nop"
        }

        fn run_on_function(&mut self, _: &mut Function, _: &mut SymbolTable) -> anyhow::Result<bool> {
            Ok(false)
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn test_builtin_passes() {
        let registry = PassRegistry::with_builtin();
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["softfloat_fixup", "apply_fixup"]
        );
        assert_eq!(
            registry.description("apply_fixup"),
            Some("Sysio Apply Fixups")
        );
        assert_eq!(registry.description("mem2reg"), None);
    }

    #[test]
    fn test_default_pipeline_order() {
        let manager = build_pipeline(&TransformConfig::default()).unwrap();
        assert_eq!(manager.pass_names(), vec!["softfloat_fixup", "apply_fixup"]);
        assert!(manager.get_pass::<SoftfloatPass>().is_some());
        assert!(manager.get_pass::<EntryWrapperPass>().is_some());
    }

    #[test]
    fn test_unknown_pass_fails() {
        let config = TransformConfig::with_passes(["apply_fixup", "dce"]);
        let err = build_pipeline(&config).err().expect("expected build_pipeline to fail");
        assert!(matches!(err, ConfigError::UnknownPass(name) if name == "dce"));
    }

    #[test]
    fn test_entry_config_reaches_pass() {
        let mut config = TransformConfig::with_passes(["apply_fixup"]);
        config.entry.name = "main".to_string();

        let manager = build_pipeline(&config).unwrap();
        let pass = manager.get_pass::<EntryWrapperPass>().unwrap();
        assert!(pass.is_entry(&Function::new("main", vec![], sysir_core::Type::Void)));
        assert!(!pass.is_entry(&Function::new("apply", vec![], sysir_core::Type::Void)));
    }

    #[test]
    fn test_register_custom_pass() {
        let mut registry = PassRegistry::with_builtin();
        registry
            .register("nop", "Does nothing", |_| Box::new(NopPass))
            .unwrap();

        let err = registry
            .register("softfloat_fixup", "Shadow", |_| Box::new(NopPass))
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicatePass(_)));

        let manager = registry
            .build(&TransformConfig::with_passes(["nop", "apply_fixup"]))
            .unwrap();
        assert_eq!(manager.pass_names(), vec!["nop", "apply_fixup"]);
    }

    #[test]
    fn test_empty_pipeline() {
        let manager = build_pipeline(&TransformConfig::with_passes(Vec::<String>::new())).unwrap();
        assert!(manager.is_empty());
    }
}
