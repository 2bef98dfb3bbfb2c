//! Named tool factories, and the registry the conversational agent starts from

use crate::config::{EndpointSettings, Settings};
use crate::memory::MemoryStore;
use crate::tools::builtin::{
    AgentStatusToolFactory, ClearMyMemoryToolFactory, HelperAgents,
    RememberInformationToolFactory, SearchAndScrapeToolFactory, SearchGoogleToolFactory,
    SearchMyMemoryToolFactory, StatusSource, UserProfileToolFactory,
};
use crate::tools::{Tool, ToolExecutor};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Tool factories sorted by name
pub struct ToolRegistry {
    factories: BTreeMap<String, Box<dyn ToolFactory>>,
}

/// Builds fresh tool instances and describes them without building one
pub trait ToolFactory: Send + Sync {
    fn create(&self) -> Box<dyn Tool>;

    fn tool_name(&self) -> &str;

    fn tool_description(&self) -> &str;
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry with the tools that delegate to the search and scraper agents
    pub fn for_delegation(endpoints: &EndpointSettings) -> Self {
        let agents = HelperAgents::new(endpoints);
        let mut registry = Self::new();
        registry.register_factory(Box::new(SearchGoogleToolFactory::new(agents.clone())));
        registry.register_factory(Box::new(SearchAndScrapeToolFactory::new(agents)));
        registry
    }

    /// Everything the conversational agent can call: delegation, status, and
    /// the memory tools when a store is given
    pub fn for_agent(settings: &Settings, memory: Option<Arc<MemoryStore>>) -> Self {
        let mut registry = Self::for_delegation(&settings.endpoints);
        registry.register_factory(Box::new(AgentStatusToolFactory::new(StatusSource {
            settings: Arc::new(settings.clone()),
            memory: memory.clone(),
        })));
        if let Some(store) = memory {
            registry.register_factory(Box::new(RememberInformationToolFactory::new(store.clone())));
            registry.register_factory(Box::new(SearchMyMemoryToolFactory::new(store.clone())));
            registry.register_factory(Box::new(UserProfileToolFactory::new(store.clone())));
            registry.register_factory(Box::new(ClearMyMemoryToolFactory::new(store)));
        }
        registry
    }

    /// Add a factory, replacing one with the same tool name
    pub fn register_factory(&mut self, factory: Box<dyn ToolFactory>) {
        self.factories.insert(factory.tool_name().to_string(), factory);
    }

    pub fn create_tool(&self, name: &str) -> Option<Box<dyn Tool>> {
        self.factories.get(name).map(|factory| factory.create())
    }

    /// Tool names in sorted order
    pub fn list_tools(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }

    /// Name and description of a registered tool
    pub fn get_tool_info(&self, name: &str) -> Option<(&str, &str)> {
        self.factories
            .get(name)
            .map(|factory| (factory.tool_name(), factory.tool_description()))
    }

    /// Executor holding one instance of every registered tool
    pub fn create_executor_with_all(&self) -> ToolExecutor {
        self.factories
            .values()
            .fold(ToolExecutor::new(), |mut executor, factory| {
                executor.register_tool(factory.create());
                executor
            })
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Declares a factory for a tool built from a cloneable state value,
/// [`HelperAgents`] unless another type is given
#[macro_export]
macro_rules! impl_tool_factory {
    ($factory:ident, $tool:ident, $state:ty, $name:expr, $description:expr) => {
        pub struct $factory {
            state: $state,
        }

        impl $factory {
            pub fn new(state: $state) -> Self {
                Self { state }
            }
        }

        impl $crate::tools::ToolFactory for $factory {
            fn create(&self) -> Box<dyn $crate::tools::Tool> {
                Box::new($tool::new(self.state.clone()))
            }

            fn tool_name(&self) -> &str {
                $name
            }

            fn tool_description(&self) -> &str {
                $description
            }
        }
    };
    ($factory:ident, $tool:ident, $name:expr, $description:expr) => {
        $crate::impl_tool_factory!(
            $factory,
            $tool,
            $crate::tools::builtin::HelperAgents,
            $name,
            $description
        );
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delegation_registry_has_both_tools() {
        let registry = ToolRegistry::for_delegation(&EndpointSettings::default());
        assert_eq!(registry.list_tools(), vec!["search_and_scrape", "search_google"]);

        for tool_name in registry.list_tools() {
            let tool = registry.create_tool(tool_name).unwrap();
            assert_eq!(tool.name(), tool_name);
            assert!(!tool.description().is_empty());
            assert!(!tool.examples().is_empty());

            let schema = tool.parameters_schema();
            assert_eq!(schema["type"], "object");
            assert_eq!(schema["required"][0], "query");

            let (name, description) = registry.get_tool_info(tool_name).unwrap();
            assert_eq!(name, tool_name);
            assert!(!description.is_empty());
        }
    }

    #[test]
    fn executor_exposes_definitions_for_every_tool() {
        let executor = ToolRegistry::for_delegation(&EndpointSettings::default())
            .create_executor_with_all();
        let names: Vec<String> = executor
            .get_tool_definitions()
            .into_iter()
            .map(|d| d.function.name)
            .collect();
        assert_eq!(names, vec!["search_and_scrape", "search_google"]);
    }

    #[tokio::test]
    async fn agent_registry_adds_memory_tools_only_with_a_store() {
        let settings = Settings::default();
        let without = ToolRegistry::for_agent(&settings, None);
        assert_eq!(
            without.list_tools(),
            vec!["get_agent_status", "search_and_scrape", "search_google"]
        );

        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::open(crate::config::MemorySettings {
            memory_dir: dir.path().to_path_buf(),
            ..Default::default()
        })
        .await
        .unwrap();
        let with = ToolRegistry::for_agent(&settings, Some(Arc::new(store)));
        assert_eq!(
            with.list_tools(),
            vec![
                "clear_my_memory",
                "get_agent_status",
                "get_user_profile",
                "remember_information",
                "search_and_scrape",
                "search_google",
                "search_my_memory",
            ]
        );
        for name in with.list_tools() {
            let tool = with.create_tool(name).unwrap();
            assert_eq!(tool.name(), name);
            assert_eq!(tool.parameters_schema()["type"], "object");
        }
    }
}
