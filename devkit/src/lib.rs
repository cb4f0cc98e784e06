/*!
# ClusterWiz DevKit - Fixtures et utilitaires de test

Bibliothèque partagée par les tests du workspace:
- Builders de local DB au format du wizard (hosts + placements)
- Fixtures de référence pour le dimensionnement YARN
- Listes de cibles de rolling restart
- Initialisation du logging pour les tests
*/

pub mod fixtures;
pub mod test_utils;

pub use fixtures::{gb_as_kb, LocalDbBuilder};
pub use test_utils::{init_test_logging, write_json_fixture};
