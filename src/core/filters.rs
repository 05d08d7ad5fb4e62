use crate::models::{DiscoverFilters, LawyerProfile};

/// Check if a lawyer passes the hard discovery filters
///
/// Unset filters always pass. The rate range is inclusive on both ends and
/// the specialty filter is satisfied by any one of the requested ids.
#[inline]
pub fn matches_filters(lawyer: &LawyerProfile, filters: &DiscoverFilters) -> bool {
    if let Some(province_id) = &filters.province_id {
        if lawyer.province_id.as_deref() != Some(province_id.as_str()) {
            return false;
        }
    }

    if let Some(city_id) = &filters.city_id {
        if lawyer.city_id.as_deref() != Some(city_id.as_str()) {
            return false;
        }
    }

    if let Some(min_rate) = filters.min_rate {
        if lawyer.hourly_rate < min_rate {
            return false;
        }
    }

    if let Some(max_rate) = filters.max_rate {
        if lawyer.hourly_rate > max_rate {
            return false;
        }
    }

    if !filters.specialties.is_empty()
        && !filters.specialties.iter().any(|id| lawyer.has_specialty(id))
    {
        return false;
    }

    true
}

/// Specialty ids the lawyer shares with `wanted`, in the lawyer's order
pub fn shared_specialties(lawyer: &LawyerProfile, wanted: &[String]) -> Vec<String> {
    let mut shared: Vec<String> = Vec::new();

    for specialty in &lawyer.specialties {
        if wanted.contains(&specialty.specialty_id) && !shared.contains(&specialty.specialty_id) {
            shared.push(specialty.specialty_id.clone());
        }
    }

    shared
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Specialty;

    fn specialty(id: &str) -> Specialty {
        Specialty {
            specialty_id: id.to_string(),
            name: id.to_string(),
            description: None,
        }
    }

    fn create_test_lawyer(hourly_rate: i32, specialties: &[&str]) -> LawyerProfile {
        LawyerProfile {
            lawyer_id: "lawyer".to_string(),
            email: "lawyer@example.com".to_string(),
            first_name: "Ana".to_string(),
            last_name: "Reyes".to_string(),
            profile_picture_url: None,
            province_id: Some("0128".to_string()),
            province_name: Some("Ilocos Norte".to_string()),
            city_id: Some("012805".to_string()),
            city_name: Some("Laoag".to_string()),
            bio: None,
            matches_count: 0,
            rating: 4.5,
            reviews: 10,
            hourly_rate,
            years_of_experience: 5,
            specialties: specialties.iter().map(|id| specialty(id)).collect(),
        }
    }

    #[test]
    fn test_no_filters_pass() {
        let lawyer = create_test_lawyer(500, &[]);
        assert!(matches_filters(&lawyer, &DiscoverFilters::default()));
    }

    #[test]
    fn test_rate_range_is_inclusive() {
        let lawyer = create_test_lawyer(500, &[]);
        let filters = DiscoverFilters {
            min_rate: Some(500),
            max_rate: Some(500),
            ..Default::default()
        };
        assert!(matches_filters(&lawyer, &filters));

        let filters = DiscoverFilters {
            max_rate: Some(499),
            ..Default::default()
        };
        assert!(!matches_filters(&lawyer, &filters));
    }

    #[test]
    fn test_location_filters() {
        let lawyer = create_test_lawyer(500, &[]);

        let filters = DiscoverFilters {
            province_id: Some("0128".to_string()),
            ..Default::default()
        };
        assert!(matches_filters(&lawyer, &filters));

        let filters = DiscoverFilters {
            city_id: Some("013301".to_string()),
            ..Default::default()
        };
        assert!(!matches_filters(&lawyer, &filters));
    }

    #[test]
    fn test_specialty_filter_any_of() {
        let lawyer = create_test_lawyer(500, &["family-law", "real-estate-law"]);

        let filters = DiscoverFilters {
            specialties: vec!["criminal-law".to_string(), "family-law".to_string()],
            ..Default::default()
        };
        assert!(matches_filters(&lawyer, &filters));

        let filters = DiscoverFilters {
            specialties: vec!["criminal-law".to_string()],
            ..Default::default()
        };
        assert!(!matches_filters(&lawyer, &filters));
    }

    #[test]
    fn test_shared_specialties_keeps_lawyer_order() {
        let lawyer = create_test_lawyer(500, &["real-estate-law", "family-law", "criminal-law"]);
        let wanted = vec!["family-law".to_string(), "real-estate-law".to_string()];

        assert_eq!(shared_specialties(&lawyer, &wanted), vec!["real-estate-law", "family-law"]);
        assert!(shared_specialties(&lawyer, &[]).is_empty());
    }
}
