pub mod signout;
