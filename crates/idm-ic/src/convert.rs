//! Conversion between the vendor-neutral model and the native layer
//!
//! Pure functions; nothing here touches a connector.

use crate::configuration::{ConfigurationProperty, ConnectorConfiguration};
use crate::native::{NativeAttribute, NativeConfigurationProperty, NativeConnectorObject, NativeUid};
use crate::object::{Attribute, AttributeValue, ConnectorObject, ObjectClass, UidAttribute, UID_NAME};

/// Convert a native configuration property to the neutral form.
///
/// The neutral `name` is taken from the native `display_name`. Callers that
/// round-trip a bundle's default configuration rely on this: the native name
/// they get back equals the display name.
pub fn native_property_to_property(native: &NativeConfigurationProperty) -> ConfigurationProperty {
    ConfigurationProperty {
        name: native.display_name.clone(),
        display_name: native.display_name.clone(),
        help_message: native.help_message.clone(),
        value: native.value.clone(),
        confidential: native.confidential,
        required: native.required,
        order: native.order,
        value_type: native.value_type.clone(),
    }
}

/// Convert a neutral configuration property to the native form.
pub fn property_to_native_property(property: &ConfigurationProperty) -> NativeConfigurationProperty {
    NativeConfigurationProperty {
        name: property.name.clone(),
        display_name: property.display_name.clone(),
        help_message: property.help_message.clone(),
        value: property.value.clone(),
        confidential: property.confidential,
        required: property.required,
        order: property.order,
        value_type: property.value_type.clone(),
    }
}

pub fn configuration_to_native(configuration: &ConnectorConfiguration) -> Vec<NativeConfigurationProperty> {
    configuration
        .properties()
        .iter()
        .map(property_to_native_property)
        .collect()
}

pub fn configuration_from_native(properties: &[NativeConfigurationProperty]) -> ConnectorConfiguration {
    properties.iter().map(native_property_to_property).collect()
}

pub fn attribute_to_native(attribute: &Attribute) -> NativeAttribute {
    NativeAttribute::new(attribute.name.clone(), attribute.values.clone())
        .multi_valued(attribute.multi_valued)
}

pub fn attributes_to_native(attributes: &[Attribute]) -> Vec<NativeAttribute> {
    attributes.iter().map(attribute_to_native).collect()
}

/// More than one value implies multi-valued even when a bundle leaves the
/// flag unset.
pub fn attribute_from_native(native: &NativeAttribute) -> Attribute {
    Attribute {
        name: native.name.clone(),
        values: native.values.clone(),
        multi_valued: native.multi_valued || native.values.len() > 1,
    }
}

/// The `name` hint is not part of the native uid and is dropped.
pub fn uid_to_native(uid: &UidAttribute) -> NativeUid {
    NativeUid {
        value: uid.value.clone(),
        revision: uid.revision.clone(),
    }
}

pub fn uid_from_native(native: &NativeUid) -> UidAttribute {
    UidAttribute::new(
        Some(UID_NAME.to_string()),
        native.value.clone(),
        native.revision.clone(),
    )
}

/// Convert a native object; the uid becomes a leading `__UID__` attribute.
pub fn object_from_native(native: &NativeConnectorObject) -> ConnectorObject {
    let mut attributes = Vec::with_capacity(native.attributes.len() + 1);
    attributes.push(Attribute::single(
        UID_NAME,
        AttributeValue::String(native.uid.value.clone()),
    ));
    attributes.extend(
        native
            .attributes
            .iter()
            .filter(|a| a.name != UID_NAME)
            .map(attribute_from_native),
    );
    ConnectorObject::new(ObjectClass::new(native.object_class.clone()), attributes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn native_property() -> NativeConfigurationProperty {
        NativeConfigurationProperty {
            name: "hostName".to_string(),
            display_name: "Host name".to_string(),
            help_message: "Target host".to_string(),
            value: json!("ldap.example.com"),
            confidential: true,
            required: true,
            order: 3,
            value_type: "java.lang.String".to_string(),
        }
    }

    #[test]
    fn test_property_name_comes_from_display_name() {
        let neutral = native_property_to_property(&native_property());
        assert_eq!(neutral.name, "Host name");
        assert_eq!(neutral.display_name, "Host name");
        assert_eq!(neutral.value, json!("ldap.example.com"));
    }

    #[test]
    fn test_property_round_trip() {
        let native = native_property();
        let back = property_to_native_property(&native_property_to_property(&native));

        assert_eq!(back.confidential, native.confidential);
        assert_eq!(back.required, native.required);
        assert_eq!(back.order, native.order);
        assert_eq!(back.help_message, native.help_message);
        assert_eq!(back.display_name, native.display_name);
        assert_eq!(back.value_type, native.value_type);
        assert_eq!(back.name, native.display_name);
    }

    #[test]
    fn test_uid_conversion() {
        let neutral = uid_from_native(&NativeUid::new("42").with_revision("3"));
        assert_eq!(neutral.name.as_deref(), Some(UID_NAME));
        assert_eq!(neutral.value, "42");
        assert_eq!(neutral.revision.as_deref(), Some("3"));

        let native = uid_to_native(&UidAttribute::from_value("jdoe"));
        assert_eq!(native, NativeUid::new("jdoe"));
    }

    #[test]
    fn test_attribute_values_untouched() {
        let attribute = Attribute::multi("groups", vec!["b", "a"]);
        let native = attribute_to_native(&attribute);
        assert_eq!(native.values, attribute.values);
        assert_eq!(attribute_from_native(&native), attribute);

        let single = attribute_from_native(&NativeAttribute::new("mail", vec!["x@y".into()]));
        assert!(!single.multi_valued);

        let unflagged = NativeAttribute::new("groups", vec!["a".into(), "b".into()]);
        assert!(attribute_from_native(&unflagged).multi_valued);
    }

    #[test]
    fn test_single_value_keeps_multi_valued_flag() {
        let attribute = Attribute::multi("groups", vec!["admins"]);
        let native = attribute_to_native(&attribute);
        assert!(native.multi_valued);

        let back = attribute_from_native(&native);
        assert!(back.multi_valued);
        assert_eq!(back, attribute);
    }

    #[test]
    fn test_object_from_native_prepends_uid() {
        let native = NativeConnectorObject {
            object_class: "__ACCOUNT__".to_string(),
            uid: NativeUid::new("jdoe"),
            attributes: vec![NativeAttribute::new("mail", vec!["jdoe@example.com".into()])],
        };
        let object = object_from_native(&native);
        assert_eq!(object.object_class, ObjectClass::account());
        assert_eq!(object.attributes[0].name, UID_NAME);
        assert_eq!(object.uid().as_deref(), Some("jdoe"));
        assert!(object.attribute("mail").is_some());
    }
}
