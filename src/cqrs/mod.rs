//! CQRS dispatch core: typed command/query buses with validation,
//! authorization, caching, metrics, and handler-level retry (§4.1, §4.2).

pub mod authorization;
pub mod cache;
pub mod command_bus;
pub mod handler;
pub mod message;
pub mod query_bus;
pub mod validation;

pub use authorization::{AllowAll, AuthorizationResult, AuthorizationService, CustomAuthorizer, StandardAuthorizer, Violation};
pub use cache::{CachedValue, InProcessCache, QueryCache};
pub use command_bus::{CommandBus, CommandBusBuilder, CommandError, CommandHandler};
pub use handler::{DuplicateHandlerError, HandlerDescriptor, TypeRegistry};
pub use message::{Command, Envelope, ExecutionContext, MessageOverrides, Query};
pub use query_bus::{QueryBus, QueryBusBuilder, QueryError, QueryHandler};
pub use validation::{FieldError, FnValidator, ValidationProcessor, ValidationResult, Validator};
