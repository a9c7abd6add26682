pub mod conversation;
pub mod file;
pub mod memory;
pub mod message;
pub mod persona;
pub mod token_log;
pub mod user;

pub use conversation::ConversationRepository;
pub use file::FileRepository;
pub use memory::MemoryRepository;
pub use message::MessageRepository;
pub use persona::PersonaRepository;
pub use token_log::TokenLogRepository;
pub use user::UserRepository;
