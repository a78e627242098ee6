pub mod adjustment;
pub mod cte;
pub mod service;

pub use service::{
    AskingService, CreateAskingTaskInput, CreateThreadInput, CreateThreadResponseInput,
};
