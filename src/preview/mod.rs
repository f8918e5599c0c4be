/// Interactive preview session and its refresh loop.
pub mod session;
