pub mod error;
pub mod openai;
pub mod util;

pub use error::AiError;
pub use openai::{OpenAi, StructuredOutput};
pub use util::{is_bare_json_object, truncate_to_char_boundary};
