// HTTP layer
// - app.rs: Router assembly
// - api.rs: JSON API routes
// - pages.rs: Server-rendered HTML routes
// - serve.rs: Bootstrap (cache, index, resolver) and serving
pub mod api;
pub mod app;
pub mod pages;
pub mod serve;
