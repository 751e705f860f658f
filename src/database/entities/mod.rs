pub mod clients;
pub mod projects;
pub mod proposal_contents;
pub mod proposals;
pub mod users;

pub use clients::Entity as Clients;
pub use projects::Entity as Projects;
pub use proposal_contents::Entity as ProposalContents;
pub use proposals::Entity as Proposals;
pub use users::Entity as Users;
