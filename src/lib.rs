pub mod io;
pub mod llm;
pub mod models;
pub mod stages;

pub use io::{read_text, Report};
pub use llm::{ChatClient, ChatParams, ClientConfig, LlmError, RewriteLanguage};
pub use models::{
    AlignmentRound, ChatMessage, Evaluation, Expansion, Invocation, InvocationOutputs, Role,
    Tournament,
};
pub use stages::{
    align, evaluate, expand, insert_kv, invoke, invoke_stream, judge, revise, rewrite, tournament,
    AlignmentConfig, JudgeConfig, MetaPromptConfig, RewriteConfig, Side,
};
