//! Naming and layout constants shared across the engine.

/// Number of hex characters in the hash suffix of generated identifiers.
pub const ID_HASH_LEN: usize = 8;

/// Maximum length of the human-readable part of a unique id.
pub const MAX_HUMAN_LEN: usize = 240;

/// Maximum length of any logical id, parameter name, or output name.
pub const MAX_ID_LEN: usize = 255;

/// Path components with this id are dropped from unique ids entirely.
pub const HIDDEN_ID: &str = "Default";

/// Path components with this id are hashed but hidden from the human part.
pub const HIDDEN_FROM_HUMAN_ID: &str = "Resource";

/// Prefix for parameters that carry a value down into a nested stack.
pub const REFERENCE_PARAM_PREFIX: &str = "reference-to-";

/// Scope under which export outputs are named.
pub const EXPORTS_SCOPE: &str = "Exports";

/// Scope under which asset parameters are named.
pub const ASSET_PARAMETERS_SCOPE: &str = "AssetParameters";

/// Separator between the version id and the object key in the asset key parameter.
pub const ASSET_KEY_SEPARATOR: &str = "||";

/// Resource type of the deployable-stack resource that embeds a nested stack.
pub const NESTED_STACK_RESOURCE_TYPE: &str = "AWS::CloudFormation::Stack";

/// Suffix of a top-level stack template document.
pub const TEMPLATE_SUFFIX: &str = ".template.json";

/// Suffix of a nested stack template document.
pub const NESTED_TEMPLATE_SUFFIX: &str = ".nested.template.json";

/// File name of the assembly manifest.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Version stamped into every assembly manifest.
pub const MANIFEST_VERSION: &str = "1.0.0";
