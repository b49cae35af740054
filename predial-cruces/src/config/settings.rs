//! Paramètres d'exécution (variables d'environnement, surchargées par la CLI)

use std::time::Duration;

use predial::{Crs, PairBudget};

/// Paramètres d'une analyse
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Système de référence commun aux parcelles et aux couches
    pub target: Crs,

    /// Plafond de paires candidates par calcul (`None` : illimité)
    pub max_pairs: Option<usize>,

    /// Délai maximal de récupération d'une couche
    pub fetch_timeout: Duration,

    /// Threads du calcul exact
    pub jobs: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            target: Crs::WGS84,
            max_pairs: None,
            fetch_timeout: Duration::from_secs(30),
            jobs: default_jobs(),
        }
    }
}

impl Settings {
    /// Charge les paramètres depuis les variables d'environnement
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            target: lookup("PREDIAL_TARGET_EPSG")
                .and_then(|s| s.parse().ok())
                .map(Crs::new)
                .unwrap_or(defaults.target),
            max_pairs: lookup("PREDIAL_MAX_PAIRS")
                .and_then(|s| s.parse().ok())
                .or(defaults.max_pairs),
            fetch_timeout: lookup("PREDIAL_FETCH_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.fetch_timeout),
            jobs: lookup("PREDIAL_JOBS")
                .and_then(|s| s.parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or(defaults.jobs),
        }
    }

    /// Applique les options de la ligne de commande
    pub fn with_overrides(
        mut self,
        srid: Option<u32>,
        max_pairs: Option<usize>,
        timeout_secs: Option<u64>,
        jobs: Option<usize>,
    ) -> Self {
        if let Some(srid) = srid {
            self.target = Crs::new(srid);
        }
        if max_pairs.is_some() {
            self.max_pairs = max_pairs;
        }
        if let Some(secs) = timeout_secs {
            self.fetch_timeout = Duration::from_secs(secs);
        }
        if let Some(jobs) = jobs.filter(|&n| n > 0) {
            self.jobs = jobs;
        }
        self
    }

    pub fn budget(&self) -> PairBudget {
        PairBudget {
            max_candidate_pairs: self.max_pairs,
        }
    }
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
