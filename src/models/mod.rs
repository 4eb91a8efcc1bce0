// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod hackathon;
pub mod stats;
pub mod user;

pub use hackathon::{
    Hackathon, HackathonAction, HackathonStatus, HackathonView, NewHackathon, Participants,
};
pub use stats::{AssessmentRecord, DashboardStats, UserActivity};
pub use user::{
    LoginEntry, Progress, ProfileUpdate, Role, SessionData, SessionUpdate, SessionUser,
    UserProfile,
};
