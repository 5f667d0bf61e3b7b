use serde::Serialize;

use crate::error::{ChannelError, Result};

// Variants that are absent from channel indexes but run the images of a base device.
const BASE_VARIANTS: &[(&str, &str)] = &[("deb", "flo"), ("tilapia", "grouper")];

pub fn base_variant_of(name: &str) -> Option<&'static str> {
    BASE_VARIANTS
        .iter()
        .find(|(variant, _)| *variant == name)
        .map(|(_, base)| *base)
}

/// Identity of the device channels are resolved for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Device {
    name: String,
    base_variant: Option<String>,
}

impl Device {
    pub fn new(name: &str) -> Result<Self> {
        let name = validate_name(name)?;
        let base_variant = base_variant_of(&name).map(str::to_string);
        Ok(Self { name, base_variant })
    }

    pub fn with_base_variant(name: &str, base_variant: &str) -> Result<Self> {
        let name = validate_name(name)?;
        let base = base_variant.trim();
        let base_variant = if base.is_empty() || base == name {
            None
        } else {
            Some(base.to_string())
        };
        Ok(Self { name, base_variant })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_variant(&self) -> Option<&str> {
        self.base_variant.as_deref()
    }

    /// Name tried when a channel does not list the primary name.
    pub fn fallback_name(&self) -> &str {
        self.base_variant.as_deref().unwrap_or(&self.name)
    }
}

fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.contains(char::is_whitespace) {
        return Err(ChannelError::InvalidDevice {
            name: name.to_string(),
        });
    }
    Ok(trimmed.to_string())
}
