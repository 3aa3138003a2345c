pub mod check;
pub mod init;
pub mod judge;
pub mod run;
