//! Cloud Firestore over its REST API

pub mod auth;
pub mod client;
pub mod value;

pub use auth::ServiceAccountKey;
pub use client::FirestoreClient;
