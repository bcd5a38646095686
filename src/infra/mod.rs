pub mod mailer;
pub mod media;
pub mod media_fs;
pub mod media_supabase;

pub use mailer::{LogMailer, RecordingMailer, SendGridMailer};
pub use media_fs::FsMediaStore;
pub use media_supabase::SupabaseMediaStore;
