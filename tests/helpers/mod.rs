pub mod db;
pub mod token;

pub use db::TestDb;
// Each test binary compiles this module on its own; not all of them sign.
#[allow(unused_imports)]
pub use token::TestSigner;
