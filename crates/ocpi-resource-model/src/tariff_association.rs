//! Tariff associations: which tariffs apply to which EVSEs from when on.

use indexmap::IndexSet;
use ocpi_resource_core::{
    impl_resource_ordering, Builder, ConstructionError, Hashable, IdentityHints, JsonReader,
    JsonWriter, MetaBuilder, Parseable, Resource, ResourceMeta, SerializeOptions, Serializable,
    Timestamp, ToBuilder, ValidationError, Warnings,
};
use serde_json::{Map, Value};

const START_DATE_TIME_KEY: &str = "start_date_time";
const TARIFF_IDS_KEY: &str = "tariff_ids";
const EVSE_UIDS_KEY: &str = "evse_uids";

/// Binding of tariffs to EVSEs, effective from a point in time.
#[derive(Debug, Clone)]
pub struct TariffAssociation {
    meta: ResourceMeta,
    start_date_time: Timestamp,
    tariff_ids: IndexSet<String>,
    evse_uids: IndexSet<String>,
}

impl TariffAssociation {
    /// Create an association and compute its ETag.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError::EmptyCollection`] without tariff ids.
    pub fn new(
        meta: ResourceMeta,
        start_date_time: Timestamp,
        tariff_ids: impl IntoIterator<Item = String>,
        evse_uids: impl IntoIterator<Item = String>,
    ) -> Result<Self, ConstructionError> {
        meta.check(Self::ID_KEY)?;
        let tariff_ids: IndexSet<String> = tariff_ids.into_iter().collect();
        if tariff_ids.is_empty() {
            return Err(ConstructionError::empty(TARIFF_IDS_KEY));
        }
        let mut association = Self {
            meta,
            start_date_time,
            tariff_ids,
            evse_uids: evse_uids.into_iter().collect(),
        };
        let etag = association.content_hash();
        association.meta.seal(etag);
        Ok(association)
    }

    /// Effective from.
    #[must_use]
    pub fn start_date_time(&self) -> Timestamp {
        self.start_date_time
    }

    /// Associated tariffs; never empty.
    #[must_use]
    pub fn tariff_ids(&self) -> &IndexSet<String> {
        &self.tariff_ids
    }

    /// EVSEs the tariffs apply to.
    #[must_use]
    pub fn evse_uids(&self) -> &IndexSet<String> {
        &self.evse_uids
    }
}

impl Resource for TariffAssociation {
    const KIND: &'static str = "TariffAssociation";
    const ID_KEY: &'static str = "id";

    fn meta(&self) -> &ResourceMeta {
        &self.meta
    }
}

impl Serializable for TariffAssociation {
    fn to_json(&self, options: SerializeOptions) -> Map<String, Value> {
        let mut writer = JsonWriter::new();
        self.meta.write_identity(&mut writer, Self::ID_KEY, options);
        writer
            .timestamp(START_DATE_TIME_KEY, self.start_date_time)
            .array(TARIFF_IDS_KEY, self.tariff_ids.iter().map(String::as_str))
            .optional_array(EVSE_UIDS_KEY, self.evse_uids.iter().map(String::as_str));
        self.meta.write_trailer(&mut writer, options);
        writer.finish()
    }
}

impl Parseable for TariffAssociation {
    fn from_json(json: &Value, hints: &IdentityHints) -> Result<Self, ValidationError> {
        let reader = JsonReader::new(json, Self::KIND)?;
        let meta = ResourceMeta::read(&reader, Self::ID_KEY, hints)?;
        Ok(Self::new(
            meta,
            reader.timestamp(START_DATE_TIME_KEY)?,
            reader.token_set::<String>(TARIFF_IDS_KEY)?,
            reader.token_set::<String>(EVSE_UIDS_KEY)?,
        )?)
    }
}

impl_resource_ordering!(TariffAssociation);

/// Mutable accumulator for [`TariffAssociation`].
#[derive(Debug, Clone, Default)]
pub struct TariffAssociationBuilder {
    /// Identity and timestamps
    pub meta: MetaBuilder,
    /// Effective from
    pub start_date_time: Option<Timestamp>,
    /// Associated tariffs
    pub tariff_ids: IndexSet<String>,
    /// EVSEs the tariffs apply to
    pub evse_uids: IndexSet<String>,
}

impl Builder for TariffAssociationBuilder {
    type Output = TariffAssociation;

    fn to_immutable(&self) -> Result<TariffAssociation, Warnings> {
        let mut warnings = Warnings::new();
        let meta = self.meta.build(TariffAssociation::ID_KEY, &mut warnings);
        warnings.require(START_DATE_TIME_KEY, self.start_date_time.as_ref());
        if self.tariff_ids.is_empty() {
            warnings.push(ConstructionError::empty(TARIFF_IDS_KEY));
        }

        let (Some(meta), Some(start_date_time), true) =
            (meta, self.start_date_time, warnings.is_empty())
        else {
            return Err(warnings);
        };
        Ok(TariffAssociation::new(
            meta,
            start_date_time,
            self.tariff_ids.iter().cloned(),
            self.evse_uids.iter().cloned(),
        )?)
    }
}

impl ToBuilder for TariffAssociation {
    type Builder = TariffAssociationBuilder;

    fn to_builder(&self) -> TariffAssociationBuilder {
        TariffAssociationBuilder {
            meta: MetaBuilder::from_meta(&self.meta),
            start_date_time: Some(self.start_date_time),
            tariff_ids: self.tariff_ids.clone(),
            evse_uids: self.evse_uids.clone(),
        }
    }
}
