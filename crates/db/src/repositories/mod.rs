mod content_repo;

pub use content_repo::ContentRepo;
