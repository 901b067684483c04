//! Identity unit: user directory and public client registration
//!
//! The directory supports self-registration with sign-in by username or
//! email, verifies email addresses before full access, and enforces the
//! baseline password policy (the manifest may only strengthen it; see
//! `config::PasswordPolicy`). The client is public: no confidential
//! secret, interactive and direct password flows only.

use crate::config::IdentityConfig;
use crate::models::UnitKind;
use crate::pending::Pending;
use crate::resources::{PropertyValue, ResourceDecl, ResourceKind};
use crate::units::UnitBlueprint;

/// Exported output names
pub const DIRECTORY_ID: &str = "directory_id";
pub const CLIENT_ID: &str = "client_id";

/// Logical resource ids
pub const DIRECTORY_RESOURCE: &str = "identity/user-directory";
pub const CLIENT_RESOURCE: &str = "identity/directory-client";
pub const AUTH_HANDLER_RESOURCE: &str = "identity/auth-handler";

/// Plan the identity unit
pub fn plan(cfg: &IdentityConfig) -> UnitBlueprint {
    let policy = &cfg.password_policy;

    let directory = ResourceDecl::new(UnitKind::Identity, "user-directory", ResourceKind::UserDirectory)
        .property("directory_name", cfg.directory_name.as_str())
        .property("self_sign_up", cfg.self_sign_up)
        .property(
            "sign_in_aliases",
            PropertyValue::map([
                ("username", PropertyValue::from(true)),
                ("email", PropertyValue::from(true)),
            ]),
        )
        .property(
            "auto_verify",
            PropertyValue::map([("email", PropertyValue::from(true))]),
        )
        .property(
            "standard_attributes",
            PropertyValue::map([(
                "email",
                PropertyValue::map([
                    ("required", PropertyValue::from(true)),
                    ("mutable", PropertyValue::from(false)),
                ]),
            )]),
        )
        .property(
            "password_policy",
            PropertyValue::map([
                ("min_length", PropertyValue::from(u64::from(policy.min_length))),
                ("require_lowercase", PropertyValue::from(policy.require_lowercase)),
                ("require_uppercase", PropertyValue::from(policy.require_uppercase)),
                ("require_digits", PropertyValue::from(policy.require_digits)),
                ("require_symbols", PropertyValue::from(policy.require_symbols)),
            ]),
        )
        .property("account_recovery", "email-only")
        // Destroying the directory destroys its users; retention is the
        // manifest's explicit choice, not a silent default.
        .property(
            "removal_policy",
            if cfg.retain_on_destroy { "retain" } else { "destroy" },
        );

    let client = ResourceDecl::new(
        UnitKind::Identity,
        "directory-client",
        ResourceKind::DirectoryClient,
    )
    .property("directory", DIRECTORY_RESOURCE)
    .property("generate_secret", false)
    .property(
        "auth_flows",
        PropertyValue::map([
            ("interactive", PropertyValue::from(true)),
            ("direct_password", PropertyValue::from(true)),
        ]),
    );

    // The auth handler is an external artifact; only its address (entry
    // point + asset path) and its wiring belong to the topology. Its
    // environment consumes the directory's own outputs, so it is declared
    // after them.
    let auth_handler = ResourceDecl::new(UnitKind::Identity, "auth-handler", ResourceKind::FunctionHandler)
        .property("entry_point", cfg.handler_entry.as_str())
        .property("asset_path", cfg.handler_asset.display().to_string())
        .property(
            "environment",
            PropertyValue::map([
                (
                    "DIRECTORY_ID",
                    Pending::from_output(UnitKind::Identity, DIRECTORY_ID).into(),
                ),
                (
                    "CLIENT_ID",
                    Pending::from_output(UnitKind::Identity, CLIENT_ID).into(),
                ),
            ]),
        );

    UnitBlueprint::new(UnitKind::Identity)
        .resource(directory)
        .resource(client)
        .resource(auth_handler)
        .export(DIRECTORY_ID, DIRECTORY_RESOURCE, "directory_id")
        .export(CLIENT_ID, CLIENT_RESOURCE, "client_id")
}
