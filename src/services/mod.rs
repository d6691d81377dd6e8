pub mod checkpoints;
pub mod clients;
pub mod credentials;
pub mod employees;
pub mod login;
pub mod roles;
pub mod users;

pub use checkpoints::CheckpointService;
pub use clients::ClientService;
pub use credentials::CredentialService;
pub use employees::EmployeeService;
pub use login::LoginService;
pub use roles::RoleService;
pub use users::UserService;
