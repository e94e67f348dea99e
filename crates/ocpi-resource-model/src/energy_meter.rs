//! Energy meters installed at a location.

use ocpi_resource_core::{
    impl_resource_ordering, Builder, Child, ConstructionError, Hashable, IdentityHints,
    JsonReader, JsonWriter, MetaBuilder, ParentSlot, Parseable, Resource, ResourceMeta,
    SerializeOptions, Serializable, ToBuilder, ValidationError, Warnings,
};
use serde_json::{Map, Value};

const MODEL_KEY: &str = "model";
const HARDWARE_VERSION_KEY: &str = "hardware_version";
const FIRMWARE_VERSION_KEY: &str = "firmware_version";

/// A calibrated meter owned by a location.
#[derive(Debug, Clone)]
pub struct EnergyMeter {
    meta: ResourceMeta,
    model: Option<String>,
    hardware_version: Option<String>,
    firmware_version: Option<String>,
    parent: ParentSlot,
}

impl EnergyMeter {
    /// Create a meter and compute its ETag.
    ///
    /// # Errors
    ///
    /// Fails if the id is empty or too long.
    pub fn new(
        meta: ResourceMeta,
        model: Option<String>,
        hardware_version: Option<String>,
        firmware_version: Option<String>,
    ) -> Result<Self, ConstructionError> {
        meta.check(Self::ID_KEY)?;
        let mut meter = Self {
            meta,
            model,
            hardware_version,
            firmware_version,
            parent: ParentSlot::new(),
        };
        let etag = meter.content_hash();
        meter.meta.seal(etag);
        Ok(meter)
    }

    /// Meter id, unique within the owning location.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.meta.identity().id
    }

    /// Model designation.
    #[must_use]
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Hardware revision.
    #[must_use]
    pub fn hardware_version(&self) -> Option<&str> {
        self.hardware_version.as_deref()
    }

    /// Firmware revision.
    #[must_use]
    pub fn firmware_version(&self) -> Option<&str> {
        self.firmware_version.as_deref()
    }
}

impl Resource for EnergyMeter {
    const KIND: &'static str = "EnergyMeter";
    const ID_KEY: &'static str = "id";

    fn meta(&self) -> &ResourceMeta {
        &self.meta
    }
}

impl Serializable for EnergyMeter {
    fn to_json(&self, options: SerializeOptions) -> Map<String, Value> {
        let mut writer = JsonWriter::new();
        self.meta.write_identity(&mut writer, Self::ID_KEY, options);
        writer
            .optional(MODEL_KEY, self.model.as_deref())
            .optional(HARDWARE_VERSION_KEY, self.hardware_version.as_deref())
            .optional(FIRMWARE_VERSION_KEY, self.firmware_version.as_deref());
        self.meta.write_trailer(&mut writer, options);
        writer.finish()
    }
}

impl Parseable for EnergyMeter {
    fn from_json(json: &Value, hints: &IdentityHints) -> Result<Self, ValidationError> {
        let reader = JsonReader::new(json, Self::KIND)?;
        let meta = ResourceMeta::read(&reader, Self::ID_KEY, hints)?;
        Ok(Self::new(
            meta,
            reader.optional_string(MODEL_KEY)?,
            reader.optional_string(HARDWARE_VERSION_KEY)?,
            reader.optional_string(FIRMWARE_VERSION_KEY)?,
        )?)
    }
}

impl Child for EnergyMeter {
    fn key(&self) -> &str {
        self.id()
    }

    fn parent_slot(&self) -> &ParentSlot {
        &self.parent
    }
}

impl_resource_ordering!(EnergyMeter);

/// Mutable accumulator for [`EnergyMeter`].
#[derive(Debug, Clone, Default)]
pub struct EnergyMeterBuilder {
    /// Identity and timestamps
    pub meta: MetaBuilder,
    /// Model designation
    pub model: Option<String>,
    /// Hardware revision
    pub hardware_version: Option<String>,
    /// Firmware revision
    pub firmware_version: Option<String>,
}

impl Builder for EnergyMeterBuilder {
    type Output = EnergyMeter;

    fn to_immutable(&self) -> Result<EnergyMeter, Warnings> {
        let mut warnings = Warnings::new();
        let Some(meta) = self.meta.build(EnergyMeter::ID_KEY, &mut warnings) else {
            return Err(warnings);
        };
        Ok(EnergyMeter::new(
            meta,
            self.model.clone(),
            self.hardware_version.clone(),
            self.firmware_version.clone(),
        )?)
    }
}

impl ToBuilder for EnergyMeter {
    type Builder = EnergyMeterBuilder;

    fn to_builder(&self) -> EnergyMeterBuilder {
        EnergyMeterBuilder {
            meta: MetaBuilder::from_meta(&self.meta),
            model: self.model.clone(),
            hardware_version: self.hardware_version.clone(),
            firmware_version: self.firmware_version.clone(),
        }
    }
}
