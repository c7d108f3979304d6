use super::dto::UpdateReferenceRequest;
use super::repo_types::Reference;
use crate::validator::Validator;

pub fn validate_reference(v: &mut Validator, name: &str, location: &str) {
    v.check(!name.is_empty(), "name", "must be provided");
    v.check(name.len() <= 200, "name", "must not be more than 200 bytes long");
    v.check(!location.is_empty(), "storage-location", "must be provided");
    v.check(
        location.len() <= 500,
        "storage-location",
        "must not be more than 500 bytes long",
    );
}

/// Applies the supplied fields of a partial update onto `reference`.
pub fn apply_update(reference: &mut Reference, input: UpdateReferenceRequest) {
    if let Some(name) = input.name {
        reference.name = name;
    }
    if let Some(location) = input.location {
        reference.location = location;
    }
    if let Some(version) = input.version {
        reference.version = version;
    }
}
