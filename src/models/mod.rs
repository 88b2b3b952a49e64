pub mod cities;

use serde::Serialize;
use std::collections::BTreeMap;

pub use cities::{City, CITIES};

/// Placeholder for absent text fields
pub const NOT_AVAILABLE: &str = "No disponible";
pub const NO_TITLE: &str = "Sin título";
pub const NO_DESCRIPTION: &str = "Sin descripción";

/// Listing links in API responses are relative to this host
pub const LISTING_BASE_URL: &str = "https://www.fincaraiz.com.co";

/// A flattened record that can be written as one row of a delimited file
pub trait TabularRecord {
    /// Header row, in column order
    const HEADERS: &'static [&'static str];

    /// Cell values, in the same order as `HEADERS`
    fn to_record(&self) -> Vec<String>;
}

/// Location information for a listing
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Location {
    pub city: String,
    pub state: String,
    pub neighbourhood: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Reduced listing record taken from a page of search results
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ListingSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub address: String,
    pub location: Location,
    pub price: Option<f64>,
    pub currency: String,
    pub bedrooms: Option<i64>,
    pub bathrooms: Option<i64>,
    pub garages: Option<i64>,
    pub area_m2: f64,
    pub images: Vec<String>,
    pub url: String,
}

impl TabularRecord for ListingSummary {
    const HEADERS: &'static [&'static str] = &[
        "id",
        "titulo",
        "descripcion",
        "direccion",
        "ciudad",
        "estado",
        "barrio",
        "latitud",
        "longitud",
        "precio",
        "moneda",
        "habitaciones",
        "baños",
        "parqueaderos",
        "area_m2",
        "imagenes",
        "url_anuncio",
    ];

    fn to_record(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.title.clone(),
            self.description.clone(),
            self.address.clone(),
            self.location.city.clone(),
            self.location.state.clone(),
            self.location.neighbourhood.clone(),
            optional_cell(self.location.latitude),
            optional_cell(self.location.longitude),
            optional_cell(self.price),
            self.currency.clone(),
            count_cell(self.bedrooms),
            count_cell(self.bathrooms),
            count_cell(self.garages),
            self.area_m2.to_string(),
            json_cell(&self.images),
            self.url.clone(),
        ]
    }
}

/// Owner of a listing as exposed by the detail response
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Owner {
    pub name: String,
    pub phone: String,
    pub kind: String,
    pub address: String,
}

impl Default for Owner {
    fn default() -> Self {
        Self {
            name: NOT_AVAILABLE.to_string(),
            phone: NOT_AVAILABLE.to_string(),
            kind: NOT_AVAILABLE.to_string(),
            address: NOT_AVAILABLE.to_string(),
        }
    }
}

/// Attributes read from the listing's technical sheet
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TechnicalSheet {
    pub property_type: String,
    pub condition: String,
    pub built_area_m2: String,
    pub private_area_m2: String,
    pub age: String,
}

/// Full listing record built from a detail response
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ListingDetail {
    pub id: String,
    pub title: String,
    pub description: String,
    pub address: String,
    pub location: Location,
    pub zone: String,
    pub commune: String,
    pub price: Option<f64>,
    pub currency: String,
    pub sheet: TechnicalSheet,
    pub bedrooms: Option<i64>,
    pub bathrooms: Option<i64>,
    pub stratum: String,
    pub floors_count: Option<String>,
    pub floor: Option<String>,
    pub garages: Option<i64>,
    pub common_expenses: Option<f64>,
    pub images: Vec<String>,
    pub url: String,
    pub owner: Owner,
    pub published_at: String,
    pub updated_at: String,
    pub facilities: Vec<String>,
    pub video: String,
    pub social_links: BTreeMap<String, String>,
}

impl TabularRecord for ListingDetail {
    const HEADERS: &'static [&'static str] = &[
        "id",
        "titulo",
        "descripcion",
        "direccion",
        "ciudad",
        "departamento",
        "barrio",
        "Zona",
        "Comuna",
        "latitud",
        "longitud",
        "precio",
        "moneda",
        "tipo_de_inmueble",
        "estado",
        "habitaciones",
        "baños",
        "area_construida_m2",
        "area_privada_m2",
        "estrato",
        "pisos_edificio",
        "piso_ubicacion",
        "parqueaderos",
        "antigüedad",
        "gastos_comunes",
        "imagenes",
        "url_anuncio",
        "propietario",
        "telefono",
        "tipo_propietario",
        "direccion_propietario",
        "fecha_publicacion",
        "fecha_actualizacion",
        "facilidades",
        "video",
        "redes_sociales",
    ];

    fn to_record(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.title.clone(),
            self.description.clone(),
            self.address.clone(),
            self.location.city.clone(),
            self.location.state.clone(),
            self.location.neighbourhood.clone(),
            self.zone.clone(),
            self.commune.clone(),
            optional_cell(self.location.latitude),
            optional_cell(self.location.longitude),
            optional_cell(self.price),
            self.currency.clone(),
            self.sheet.property_type.clone(),
            self.sheet.condition.clone(),
            count_cell(self.bedrooms),
            count_cell(self.bathrooms),
            self.sheet.built_area_m2.clone(),
            self.sheet.private_area_m2.clone(),
            self.stratum.clone(),
            self.floors_count.clone().unwrap_or_default(),
            self.floor.clone().unwrap_or_default(),
            count_cell(self.garages),
            self.sheet.age.clone(),
            optional_cell(self.common_expenses),
            json_cell(&self.images),
            self.url.clone(),
            self.owner.name.clone(),
            self.owner.phone.clone(),
            self.owner.kind.clone(),
            self.owner.address.clone(),
            self.published_at.clone(),
            self.updated_at.clone(),
            json_cell(&self.facilities),
            self.video.clone(),
            json_cell(&self.social_links),
        ]
    }
}

fn optional_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn count_cell(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Lists and maps are stored as a single JSON-encoded cell
fn json_cell<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}
