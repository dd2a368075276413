pub mod keitaro;
pub mod telegram;

pub use keitaro::KeitaroAdapter;
pub use telegram::TelegramAdapter;
