//! Library and symbol naming conventions.

use std::fmt;

use crate::error::ResolutionError;

/// Identifier of the C type support implementation.
pub const TYPESUPPORT_IDENTIFIER: &str = "rosidl_typesupport_c";

const HANDLE_ACCESSOR: &str = "get_message_type_support_handle";

/// Which half of a service a message type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageRole {
    /// The request message.
    Request,
    /// The response message.
    Response,
}

impl MessageRole {
    /// Suffix appended to the service type name.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Request => "Request",
            Self::Response => "Response",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Platform-specific shared library extension.
pub fn lib_ext() -> &'static str {
    if cfg!(target_os = "windows") {
        "dll"
    } else if cfg!(target_os = "macos") {
        "dylib"
    } else {
        "so"
    }
}

/// Names derived from a service's package and type name.
///
/// ```
/// use introspect_typesupport::{MessageRole, TypeSupportNames};
///
/// let names = TypeSupportNames::for_service("example_interfaces", "AddTwoInts").unwrap();
/// assert_eq!(names.library_stem(), "libexample_interfaces__rosidl_typesupport_c");
/// assert_eq!(
///     names.symbol(MessageRole::Request),
///     "rosidl_typesupport_c__get_message_type_support_handle__example_interfaces__srv__AddTwoInts_Request",
/// );
/// assert_eq!(names.type_name(MessageRole::Response), "example_interfaces/srv/AddTwoInts_Response");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSupportNames {
    package_name: String,
    service_type_name: String,
}

impl TypeSupportNames {
    /// Validate the names and build the naming set.
    pub fn for_service(
        package_name: &str,
        service_type_name: &str,
    ) -> Result<Self, ResolutionError> {
        validate("package", package_name)?;
        validate("service type", service_type_name)?;
        Ok(Self {
            package_name: package_name.to_owned(),
            service_type_name: service_type_name.to_owned(),
        })
    }

    /// Package name.
    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    /// Service type name.
    pub fn service_type_name(&self) -> &str {
        &self.service_type_name
    }

    /// Library name without extension, `lib<package>__rosidl_typesupport_c`.
    pub fn library_stem(&self) -> String {
        format!("lib{}__{TYPESUPPORT_IDENTIFIER}", self.package_name)
    }

    /// Library file name for this platform.
    pub fn library_file_name(&self) -> String {
        format!("{}.{}", self.library_stem(), lib_ext())
    }

    /// Accessor symbol for one half of the service.
    pub fn symbol(&self, role: MessageRole) -> String {
        format!(
            "{TYPESUPPORT_IDENTIFIER}__{HANDLE_ACCESSOR}__{}__srv__{}_{}",
            self.package_name,
            self.service_type_name,
            role.suffix()
        )
    }

    /// Fully qualified message type name for one half of the service.
    pub fn type_name(&self, role: MessageRole) -> String {
        format!(
            "{}/srv/{}_{}",
            self.package_name,
            self.service_type_name,
            role.suffix()
        )
    }
}

fn validate(kind: &'static str, name: &str) -> Result<(), ResolutionError> {
    let reject = |reason| ResolutionError::InvalidName {
        kind,
        name: name.to_owned(),
        reason,
    };
    if name.is_empty() {
        return Err(reject("must not be empty"));
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(reject("must not start with a digit"));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(reject("only ASCII letters, digits and '_' are allowed"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;

    #[test]
    fn library_file_name_has_platform_extension() {
        let names = TypeSupportNames::for_service("demo_pkg", "Echo").unwrap();
        assert_eq!(
            names.library_file_name(),
            format!("libdemo_pkg__rosidl_typesupport_c.{}", lib_ext())
        );
    }

    #[test]
    fn symbols_differ_only_in_suffix() {
        let names = TypeSupportNames::for_service("demo_pkg", "Echo").unwrap();
        let request = names.symbol(MessageRole::Request);
        let response = names.symbol(MessageRole::Response);
        assert!(request.ends_with("__demo_pkg__srv__Echo_Request"));
        assert!(response.ends_with("__demo_pkg__srv__Echo_Response"));
        assert_eq!(
            request.trim_end_matches("Request"),
            response.trim_end_matches("Response")
        );
    }

    #[rstest]
    #[case("", "Echo", "package")]
    #[case("demo_pkg", "", "service type")]
    #[case("demo-pkg", "Echo", "package")]
    #[case("demo_pkg", "Echo%s", "service type")]
    #[case("9pkg", "Echo", "package")]
    fn invalid_names_are_rejected(
        #[case] package: &str,
        #[case] service: &str,
        #[case] expected_kind: &str,
    ) {
        match TypeSupportNames::for_service(package, service) {
            Err(ResolutionError::InvalidName { kind, .. }) => assert_eq!(kind, expected_kind),
            other => panic!("expected InvalidName, got {other:?}"),
        }
    }

    proptest! {
        #[test]
        fn symbol_length_is_structural(
            package in "[a-z][a-z0-9_]{0,40}",
            service in "[A-Z][A-Za-z0-9]{0,40}",
        ) {
            let names = TypeSupportNames::for_service(&package, &service).unwrap();
            for role in [MessageRole::Request, MessageRole::Response] {
                let symbol = names.symbol(role);
                let expected = TYPESUPPORT_IDENTIFIER.len() + 2
                    + HANDLE_ACCESSOR.len() + 2
                    + package.len() + "__srv__".len()
                    + service.len() + 1 + role.suffix().len();
                prop_assert_eq!(symbol.len(), expected);
            }
        }
    }
}
