//! Login sessions over a pseudo-terminal.
//!
//! - [`PtyProcess`]: expect/send on a child's pty
//! - [`PromptMatcher`]: the prompts ssh shows during login, in priority order
//! - [`LoginSession`]: one login, possibly through a jump host

mod login;
mod process;
mod prompt;

pub use login::{LoginContext, LoginSession};
pub use process::{LINE_ENDING, PtyProcess};
pub use prompt::{
    CONNECTION_REFUSED, HOST_KEY_PROMPT, LoginPrompt, PASSWORD_PROMPT, PromptMatcher,
    SHELL_PROMPT, shell_prompt,
};
