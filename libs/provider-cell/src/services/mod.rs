pub mod directory;

pub use directory::{InMemoryProviderDirectory, ProviderDirectory, SupabaseProviderDirectory};
