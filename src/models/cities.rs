use serde::Serialize;

/// A city the search API can be queried for
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct City {
    pub name: &'static str,
    /// `[longitude, latitude]`, the order the API expects in `location_point`
    pub coordinates: [f64; 2],
    /// City id assigned by the search API
    pub id: &'static str,
}

/// Cities of the Aburrá valley, in crawl order
pub const CITIES: [City; 10] = [
    City {
        name: "Medellín",
        coordinates: [-75.57786065131165, 6.249816589298594],
        id: "183f0a11-9452-4160-9089-1b0e7ed45863",
    },
    City {
        name: "Sabaneta",
        coordinates: [-75.615552, 6.150848],
        id: "241a17ef-3aa0-485c-93aa-689fc2f2d114",
    },
    City {
        name: "Envigado",
        coordinates: [-75.582766, 6.166891],
        id: "596f30cb-3582-416e-a071-71634190a703",
    },
    City {
        name: "Itagüí",
        coordinates: [-75.61224929212936, 6.175069444446771],
        id: "cf5dc27a-9e05-4b0a-b98a-0715fe4e5d2b",
    },
    City {
        name: "Bello",
        coordinates: [-75.554813, 6.333991],
        id: "9feb0402-fc35-4538-8ca1-d53c0fec2c35",
    },
    City {
        name: "La estrella",
        coordinates: [-75.637076, 6.145162],
        id: "c19b4e81-f003-408a-b7db-4bbcb9b3b6d5",
    },
    City {
        name: "Caldas",
        coordinates: [-75.63279850494914, 6.092031757719933],
        id: "5499b608-1002-43a3-9215-01c40ffae22b",
    },
    City {
        name: "Copacabana",
        coordinates: [-75.509309, 6.348654],
        id: "b8f0f380-18c4-49ee-a6b3-92b454846718",
    },
    City {
        name: "Girardota",
        coordinates: [-75.444235, 6.379487],
        id: "0affff3e-ec6a-421e-a2d4-8b198493cff9",
    },
    City {
        name: "Barbosa",
        coordinates: [-75.331627, 6.439195],
        id: "1041113c-cced-48fc-a1d5-c10002214f67",
    },
];

/// Look up a city by its exact name
pub fn find(name: &str) -> Option<&'static City> {
    CITIES.iter().find(|city| city.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_known_city() {
        let city = find("Itagüí").expect("Itagüí should be in the table");
        assert_eq!(city.id, "cf5dc27a-9e05-4b0a-b98a-0715fe4e5d2b");
        assert_eq!(city.coordinates, [-75.61224929212936, 6.175069444446771]);
    }

    #[test]
    fn test_find_is_exact() {
        assert!(find("medellín").is_none());
        assert!(find("La Estrella").is_none());
        assert!(find("La estrella").is_some());
    }

    #[test]
    fn test_crawl_order_starts_with_medellin() {
        assert_eq!(CITIES[0].name, "Medellín");
        assert_eq!(CITIES[9].name, "Barbosa");
    }
}
