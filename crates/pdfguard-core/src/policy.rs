// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Protection policy — passwords, permission bitset and watermark style applied
// to every document in a run.

use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::{GuardError, Result};

bitflags! {
    /// Operations a reader may perform without the owner password.
    ///
    /// Bit positions match the standard security handler `/P` entry
    /// (ISO 32000-1, table 22).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Permissions: u32 {
        const PRINT = 1 << 2;
        const MODIFY = 1 << 3;
        const COPY = 1 << 4;
        const ANNOTATE = 1 << 5;
        const FILL_FORMS = 1 << 8;
        const EXTRACT = 1 << 9;
        const ASSEMBLE = 1 << 10;
        const HIGH_RES_PRINT = 1 << 11;
    }
}

impl Permissions {
    /// Recover the permission set from a `/P` value read out of a document.
    pub fn from_p_value(p: i64) -> Self {
        Self::from_bits_truncate(p as u32)
    }

    /// Lowercase names of the granted permissions, for logs and reports.
    pub fn names(&self) -> Vec<&'static str> {
        self.iter_names()
            .map(|(name, _)| match name {
                "PRINT" => "print",
                "MODIFY" => "modify",
                "COPY" => "copy",
                "ANNOTATE" => "annotate",
                "FILL_FORMS" => "fill-forms",
                "EXTRACT" => "extract",
                "ASSEMBLE" => "assemble",
                "HIGH_RES_PRINT" => "high-res-print",
                _ => "unknown",
            })
            .collect()
    }
}

impl Default for Permissions {
    /// Print, copy, form filling and high-resolution printing; no modification,
    /// annotation, extraction or assembly.
    fn default() -> Self {
        Self::PRINT | Self::COPY | Self::FILL_FORMS | Self::HIGH_RES_PRINT
    }
}

impl FromStr for Permissions {
    type Err = GuardError;

    /// Parse a comma-separated list such as `print,copy,fill-forms`.
    fn from_str(s: &str) -> Result<Self> {
        let mut perms = Permissions::empty();
        for raw in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let flag = match raw.to_ascii_lowercase().replace('_', "-").as_str() {
                "print" => Permissions::PRINT,
                "modify" => Permissions::MODIFY,
                "copy" => Permissions::COPY,
                "annotate" => Permissions::ANNOTATE,
                "fill-forms" | "forms" => Permissions::FILL_FORMS,
                "extract" => Permissions::EXTRACT,
                "assemble" => Permissions::ASSEMBLE,
                "high-res-print" => Permissions::HIGH_RES_PRINT,
                "none" => Permissions::empty(),
                "all" => Permissions::all(),
                other => {
                    return Err(GuardError::InvalidPolicy(format!(
                        "unknown permission '{other}'"
                    )));
                }
            };
            perms |= flag;
        }
        Ok(perms)
    }
}

/// Where the watermark text is drawn on each page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    /// Centred horizontally, a fixed distance above the bottom edge.
    Bottom,
    /// Centred on the page, rotated (45° by default).
    Center,
    /// Repeated copies along a 45° line through the page centre.
    Diagonal,
}

impl FromStr for Placement {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "bottom" => Ok(Self::Bottom),
            "center" | "centre" => Ok(Self::Center),
            "diagonal" => Ok(Self::Diagonal),
            other => Err(GuardError::InvalidPolicy(format!(
                "unknown placement '{other}' (expected bottom, center or diagonal)"
            ))),
        }
    }
}

/// Visual parameters of the watermark overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkStyle {
    pub text: String,
    /// Fill alpha, 0.0 (invisible) to 1.0 (opaque).
    pub opacity: f32,
    /// Font size in points.
    pub font_size: f32,
    pub placement: Placement,
    /// Explicit rotation in degrees; only `center` honours it.
    pub rotation: Option<f32>,
    /// Baseline distance above the bottom edge for `bottom` placement.
    pub bottom_offset: f32,
    /// Gray level of the text fill, 0.0 black to 1.0 white.
    pub gray: f32,
}

impl Default for WatermarkStyle {
    fn default() -> Self {
        Self {
            text: "Protected Document".to_string(),
            opacity: 0.3,
            font_size: 14.0,
            placement: Placement::Bottom,
            rotation: None,
            bottom_offset: 50.0,
            gray: 0.5,
        }
    }
}

impl WatermarkStyle {
    pub fn validate(&self) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(GuardError::InvalidPolicy(
                "watermark text is empty".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(GuardError::InvalidPolicy(format!(
                "opacity {} outside 0.0..=1.0",
                self.opacity
            )));
        }
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(GuardError::InvalidPolicy(format!(
                "font size {} must be positive",
                self.font_size
            )));
        }
        if !(30.0..=50.0).contains(&self.bottom_offset) {
            return Err(GuardError::InvalidPolicy(format!(
                "bottom offset {} outside 30..=50",
                self.bottom_offset
            )));
        }
        if !(0.0..=1.0).contains(&self.gray) {
            return Err(GuardError::InvalidPolicy(format!(
                "gray level {} outside 0.0..=1.0",
                self.gray
            )));
        }
        if let Some(rotation) = self.rotation
            && !rotation.is_finite()
        {
            return Err(GuardError::InvalidPolicy(
                "rotation must be a finite number of degrees".to_string(),
            ));
        }
        Ok(())
    }
}

/// Passwords, permissions and watermark applied to every document in a run.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtectionPolicy {
    /// Password required to open the document.
    #[serde(skip_serializing)]
    pub user_password: String,
    /// Password that lifts the permission restrictions.
    #[serde(skip_serializing)]
    pub owner_password: String,
    pub permissions: Permissions,
    pub watermark: WatermarkStyle,
}

impl Default for ProtectionPolicy {
    fn default() -> Self {
        Self {
            user_password: String::new(),
            owner_password: String::new(),
            permissions: Permissions::default(),
            watermark: WatermarkStyle::default(),
        }
    }
}

impl std::fmt::Debug for ProtectionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtectionPolicy")
            .field("user_password", &"<redacted>")
            .field("owner_password", &"<redacted>")
            .field("permissions", &self.permissions)
            .field("watermark", &self.watermark)
            .finish()
    }
}

impl ProtectionPolicy {
    pub fn new(user_password: impl Into<String>, owner_password: impl Into<String>) -> Self {
        Self {
            user_password: user_password.into(),
            owner_password: owner_password.into(),
            ..Self::default()
        }
    }

    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_watermark(mut self, watermark: WatermarkStyle) -> Self {
        self.watermark = watermark;
        self
    }

    /// The owner password, falling back to the user password when unset.
    pub fn effective_owner_password(&self) -> &str {
        if self.owner_password.is_empty() {
            &self.user_password
        } else {
            &self.owner_password
        }
    }

    /// Reject policies that would produce an unprotected or unrenderable result.
    pub fn validate(&self) -> Result<()> {
        if self.user_password.is_empty() {
            return Err(GuardError::InvalidPolicy(
                "user password is required".to_string(),
            ));
        }
        if self.user_password.len() > 32 || self.effective_owner_password().len() > 32 {
            tracing::warn!("passwords longer than 32 bytes are truncated by the security handler");
        }
        self.watermark.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_permissions_deny_modification() {
        let perms = Permissions::default();
        assert!(perms.contains(Permissions::PRINT));
        assert!(perms.contains(Permissions::COPY));
        assert!(perms.contains(Permissions::FILL_FORMS));
        assert!(perms.contains(Permissions::HIGH_RES_PRINT));
        assert!(!perms.contains(Permissions::MODIFY));
        assert!(!perms.contains(Permissions::ANNOTATE));
        assert!(!perms.contains(Permissions::EXTRACT));
        assert!(!perms.contains(Permissions::ASSEMBLE));
    }

    #[test]
    fn from_p_value_ignores_reserved_bits() {
        // PRINT | COPY with bits 7-8 and 13-32 set, as a signed 32-bit value.
        let p = (0xFFFF_F0C0u32 | 0b1_0100) as i32 as i64;
        assert_eq!(
            Permissions::from_p_value(p),
            Permissions::PRINT | Permissions::COPY
        );
    }

    #[test]
    fn parse_permission_list() {
        let perms: Permissions = "print, copy,fill_forms".parse().unwrap();
        assert_eq!(
            perms,
            Permissions::PRINT | Permissions::COPY | Permissions::FILL_FORMS
        );
        assert_eq!("none".parse::<Permissions>().unwrap(), Permissions::empty());
        assert!("print,teleport".parse::<Permissions>().is_err());
    }

    #[test]
    fn permission_names() {
        let names = (Permissions::PRINT | Permissions::HIGH_RES_PRINT).names();
        assert_eq!(names, vec!["print", "high-res-print"]);
    }

    #[test]
    fn placement_parsing() {
        assert_eq!("Diagonal".parse::<Placement>().unwrap(), Placement::Diagonal);
        assert_eq!("centre".parse::<Placement>().unwrap(), Placement::Center);
        assert!("top".parse::<Placement>().is_err());
    }

    #[test]
    fn owner_password_falls_back_to_user() {
        let policy = ProtectionPolicy::new("P1", "");
        assert_eq!(policy.effective_owner_password(), "P1");
        let policy = ProtectionPolicy::new("P1", "admin");
        assert_eq!(policy.effective_owner_password(), "admin");
    }

    #[test]
    fn validate_rejects_missing_user_password() {
        assert!(matches!(
            ProtectionPolicy::default().validate(),
            Err(GuardError::InvalidPolicy(_))
        ));
        assert!(ProtectionPolicy::new("P1", "owner").validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_style() {
        let mut style = WatermarkStyle::default();
        style.opacity = 1.5;
        assert!(style.validate().is_err());

        let mut style = WatermarkStyle::default();
        style.bottom_offset = 10.0;
        assert!(style.validate().is_err());

        let mut style = WatermarkStyle::default();
        style.font_size = 0.0;
        assert!(style.validate().is_err());
    }

    #[test]
    fn debug_redacts_passwords() {
        let policy = ProtectionPolicy::new("secret-user", "secret-owner");
        let rendered = format!("{policy:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn policy_json_omits_passwords() {
        let policy = ProtectionPolicy::new("P1", "owner");
        let json = serde_json::to_string(&policy).unwrap();
        assert!(!json.contains("P1"));
        assert!(!json.contains("owner_password"));
    }
}
