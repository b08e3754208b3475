/// Application name
pub const APP_NAME: &str = "Wave";

/// The only texts accepted as the first message of a new chat
pub const OPENERS: [&str; 3] = ["Hi", "Hello", "I need your help!"];

/// Top-level collection of user profiles
pub const USERS_COLLECTION: &str = "users";

/// Top-level collection of chat records
pub const CHATS_COLLECTION: &str = "chats";

/// Sub-collection of a chat record holding its messages
pub const MESSAGES_COLLECTION: &str = "messages";

/// Fixed document id of a chat's opener; at most one can exist
pub const OPENER_MESSAGE_ID: &str = "opener";

/// Blob store prefix for files attached to chats
pub const CHAT_FILES_PREFIX: &str = "chat_files";

/// Avatar used when a profile has none recorded
pub const DEFAULT_AVATAR_ID: i64 = 1;

/// Number of bundled avatars (ids are 1-based)
pub const AVATAR_COUNT: i64 = 8;

/// Display name shown when a peer's profile cannot be loaded
pub const PLACEHOLDER_DISPLAY_NAME: &str = "User";

/// Maximum file attachment size in bytes (50 MiB)
pub const MAX_FILE_SIZE: usize = 50 * 1024 * 1024;

/// Prefix of the denormalized last message for file attachments
pub const FILE_PREVIEW_PREFIX: &str = "Sent a file: ";
