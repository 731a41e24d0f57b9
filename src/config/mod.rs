pub mod defaults;
pub mod settings;

pub use defaults::DefaultConfig;
pub use settings::{ClassifierConfig, Config, DisplayConfig, ExtractorConfig, IndicatorConfig};
