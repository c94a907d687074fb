use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("-{flag}: missing argument <{name}>")]
    MissingArgument { flag: String, name: &'static str },

    #[error("-{flag}: invalid value '{token}' for <{name}>: {reason}")]
    InvalidValue {
        flag: String,
        name: &'static str,
        token: String,
        reason: String,
    },

    #[error("-filtered_transform needs a point filter such as -keep_class or -drop_z_below")]
    FilterMissing,
}
