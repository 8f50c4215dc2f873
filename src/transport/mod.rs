pub mod requester;
pub mod reqwest_requester;
