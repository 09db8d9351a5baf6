pub mod handler;
pub mod injection_defense;
pub mod system_prompt;

pub use handler::{
    handle_event, handle_invocation, process_event, ClientFactory, HttpClientFactory,
    ReplyOutcome,
};
pub use injection_defense::sanitize;
pub use system_prompt::{build_prompt, load_prompt_template};
