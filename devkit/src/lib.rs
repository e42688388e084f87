/*!
# PortPulse DevKit - Utilitaires de test et de développement

Bibliothèque facilitant les tests du collecteur avec:
- Constructeurs de flux JSON (lectures digitales/analogiques)
- Forge de licences signées pour les tests
- Environnement temporaire (répertoire store + fichier de flux)
*/

pub mod feed_fixtures;
pub mod license_forge;
pub mod test_env;

pub use feed_fixtures::FeedBuilder;
pub use license_forge::LicenseForge;
pub use test_env::TestEnv;
