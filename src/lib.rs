//! Attendance API - backend for a classroom attendance tracker
//!
//! This crate provides the REST + WebSocket API for:
//! - User signup/signin with teacher and student roles
//! - Class creation and roster management
//! - Live attendance sessions with real-time marking over WebSocket
//! - Durable attendance history per student and per class

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod live;
pub mod routes;
pub mod state;
