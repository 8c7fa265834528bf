//! Conversions between the local DTOs and identity-provider representations

use crate::domain::{
    CredentialRepresentation, GroupRepresentation, MappingsRepresentation, UserRepresentation,
    UserRequest, UserResponse,
};

/// Build the representation submitted on user creation.
///
/// New accounts are enabled and carry one non-temporary password credential.
pub fn to_user_representation(request: UserRequest) -> UserRepresentation {
    UserRepresentation {
        id: None,
        username: Some(request.username),
        email: Some(request.email),
        first_name: Some(request.first_name),
        last_name: Some(request.last_name),
        enabled: true,
        email_verified: false,
        credentials: vec![CredentialRepresentation::password(request.password)],
    }
}

/// Assemble the response from the three separate lookups.
///
/// Only realm-level role mappings are reported.
pub fn to_user_response(
    user: UserRepresentation,
    mappings: MappingsRepresentation,
    groups: Vec<GroupRepresentation>,
) -> UserResponse {
    UserResponse {
        first_name: user.first_name.unwrap_or_default(),
        last_name: user.last_name.unwrap_or_default(),
        email: user.email.unwrap_or_default(),
        roles: mappings
            .realm_mappings
            .into_iter()
            .map(|role| role.name)
            .collect(),
        groups: groups.into_iter().map(|group| group.name).collect(),
    }
}
