use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ModelError {
    #[error("invalid lexical value for {type_name}: '{value}'")]
    InvalidLexicalValue { type_name: String, value: String },

    #[error("unknown data type: {0}")]
    UnknownDataType(String),

    #[error("document must contain exactly one top-level assembly")]
    MissingRootAssembly,

    #[error("unbalanced tree builder: {0} assembly scope(s) left open")]
    UnbalancedBuilder(usize),

    #[error("flags and fields cannot be added outside an assembly scope")]
    NoOpenAssembly,

    #[error("no ancestor assembly named '{0}' to close a cycle against")]
    NoCycleTarget(String),
}
