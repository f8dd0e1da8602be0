use crate::delegate::ReturnAdapter;

/// An invalid handler shape, reported when a delegate is created.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("parameter {index} has no name")]
    UnnamedParameter { index: usize },

    #[error("handler takes {expected} parameters but {found} were described")]
    ParameterCount { expected: usize, found: usize },

    #[error("parameter `{name}` would be a second body parameter")]
    MultipleBodyParameters { name: String },

    #[error("parameter `{name}` binds to route value `{key}`, which the route does not declare")]
    UnknownRouteParameter { name: String, key: String },

    #[error("no coercion is registered for `{ty}` (parameter `{name}`)")]
    NoCoercion { name: String, ty: &'static str },

    #[error("parameter `{name}` of type `{ty}` needs a default value or a zero value")]
    NoZeroValue { name: String, ty: &'static str },

    #[error("default value of parameter `{name}` is a `{found}`, expected `{expected}`")]
    DefaultTypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("parameter `{name}` of type `{ty}` cannot be bound from the request")]
    Unbindable { name: String, ty: &'static str },

    #[error("body parameter `{name}` of type `{ty}` has no value for an empty body")]
    EmptyBodyUnsupported { name: String, ty: &'static str },

    #[error("invalid route: {0}")]
    Route(#[from] matchit::InsertError),
}

/// A handler broke its contract while serving a request.
///
/// Invalid input is never reported through this type: failed coercions
/// and malformed bodies are answered with a client error status instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("the handler returned a null result")]
    NullResult,

    #[error("the handler returned a null deferred value")]
    NullDeferred,

    #[error("a deferred object resolved to another deferred object")]
    NestedDeferred,

    #[error("no service of type `{ty}` is registered")]
    MissingService { ty: &'static str },

    #[error("failed to serialize the response: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("argument {index} is not a `{expected}`")]
    Argument {
        index: usize,
        expected: &'static str,
    },

    #[error("the handler output does not match its {adapter:?} adapter")]
    Adapter { adapter: ReturnAdapter },
}
