// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Authenticated user identity

use std::fmt;

use serde::{Deserialize, Serialize};

/// The logged-in account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub registrations: Vec<Registration>,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            full_name: None,
            avatar_url: None,
            registrations: Vec::new(),
        }
    }

    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    pub fn with_registrations(mut self, registrations: Vec<Registration>) -> Self {
        self.registrations = registrations;
        self
    }

    /// First word of the full name
    pub fn first_name(&self) -> Option<&str> {
        self.full_name
            .as_deref()
            .and_then(|name| name.split(' ').next())
    }

    /// Everything after the first word of the full name
    pub fn last_name(&self) -> Option<&str> {
        self.full_name
            .as_deref()
            .and_then(|name| name.split_once(' '))
            .map(|(_, rest)| rest)
            .filter(|rest| !rest.is_empty())
    }

    /// First registration, the one used when none is specified
    pub fn default_registration(&self) -> Option<&Registration> {
        self.registrations.first()
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.full_name.as_deref() {
            Some(name) if !name.is_empty() => f.write_str(name),
            _ => f.write_str(&self.username),
        }
    }
}

/// Enrollment of the user in a training program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub code: u64,
    pub name: String,
    /// Academic year such as `2024-2025`, empty when unknown
    #[serde(default)]
    pub year: String,
}

impl Registration {
    pub fn new(code: u64, name: impl Into<String>, year: impl Into<String>) -> Self {
        Self {
            code,
            name: name.into(),
            year: year.into(),
        }
    }
}

impl fmt::Display for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.year.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{} ({})", self.name, self.year)
        }
    }
}
