pub mod supabase;

pub use supabase::{Prefer, SupabaseClient};
