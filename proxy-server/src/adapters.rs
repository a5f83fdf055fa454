//! Builds the one [`proxy_adapters::Adapter`] instance per ecosystem, wiring
//! in whatever upstream base URL the configuration overrides.

use std::sync::Arc;

use proxy_adapters::Adapter;
use proxy_adapters::cargo::CargoAdapter;
use proxy_adapters::composer::ComposerAdapter;
use proxy_adapters::conan::ConanAdapter;
use proxy_adapters::conda::CondaAdapter;
use proxy_adapters::cran::CranAdapter;
use proxy_adapters::debian::DebianAdapter;
use proxy_adapters::go::GoAdapter;
use proxy_adapters::hex::HexAdapter;
use proxy_adapters::maven::MavenAdapter;
use proxy_adapters::npm::NpmAdapter;
use proxy_adapters::nuget::NuGetAdapter;
use proxy_adapters::oci::OciAdapter;
use proxy_adapters::pub_dev::PubDevAdapter;
use proxy_adapters::pypi::PyPiAdapter;
use proxy_adapters::rpm::RpmAdapter;
use proxy_adapters::rubygems::RubyGemsAdapter;
use proxy_core::Ecosystem;

use proxy_config::Config;

fn upstream(config: &Config, key: &str, default: &str) -> String {
    config.upstream.get(key).cloned().unwrap_or_else(|| default.to_string())
}

/// One adapter per ecosystem, each overridable via `config.upstream.<name>`.
pub fn build_adapters(config: &Config) -> Vec<(Ecosystem, Arc<dyn Adapter>)> {
    vec![
        (Ecosystem::Npm, Arc::new(NpmAdapter::new(upstream(config, "npm", "https://registry.npmjs.org"))) as Arc<dyn Adapter>),
        (
            Ecosystem::Cargo,
            Arc::new(CargoAdapter::new(
                upstream(config, "cargo-dl", "https://static.crates.io/crates"),
                upstream(config, "cargo-index", "https://index.crates.io"),
            )) as Arc<dyn Adapter>,
        ),
        (Ecosystem::Maven, Arc::new(MavenAdapter::new(upstream(config, "maven", "https://repo1.maven.org/maven2"))) as Arc<dyn Adapter>),
        (Ecosystem::PyPi, Arc::new(PyPiAdapter::new(upstream(config, "pypi", "https://pypi.org"))) as Arc<dyn Adapter>),
        (Ecosystem::RubyGems, Arc::new(RubyGemsAdapter::new(upstream(config, "rubygems", "https://rubygems.org"))) as Arc<dyn Adapter>),
        (Ecosystem::Hex, Arc::new(HexAdapter::new(upstream(config, "hex", "https://repo.hex.pm"))) as Arc<dyn Adapter>),
        (Ecosystem::Conda, Arc::new(CondaAdapter::new(upstream(config, "conda", "https://conda.anaconda.org"))) as Arc<dyn Adapter>),
        (Ecosystem::Debian, Arc::new(DebianAdapter::new(upstream(config, "debian", "https://deb.debian.org/debian"))) as Arc<dyn Adapter>),
        (Ecosystem::Rpm, Arc::new(RpmAdapter::new(upstream(config, "rpm", "https://download.fedoraproject.org/pub/fedora/linux"))) as Arc<dyn Adapter>),
        (Ecosystem::Cran, Arc::new(CranAdapter::new(upstream(config, "cran", "https://cran.r-project.org"))) as Arc<dyn Adapter>),
        (Ecosystem::Go, Arc::new(GoAdapter::new(upstream(config, "go", "https://proxy.golang.org"))) as Arc<dyn Adapter>),
        (Ecosystem::NuGet, Arc::new(NuGetAdapter::new(upstream(config, "nuget", "https://api.nuget.org"))) as Arc<dyn Adapter>),
        (Ecosystem::Pub, Arc::new(PubDevAdapter::new(upstream(config, "pub", "https://pub.dev"))) as Arc<dyn Adapter>),
        (Ecosystem::Composer, Arc::new(ComposerAdapter::new(upstream(config, "composer", "https://repo.packagist.org"))) as Arc<dyn Adapter>),
        (Ecosystem::Conan, Arc::new(ConanAdapter::new(upstream(config, "conan", "https://center.conan.io"))) as Arc<dyn Adapter>),
        (Ecosystem::Oci, Arc::new(OciAdapter::new(upstream(config, "oci", "https://registry-1.docker.io"))) as Arc<dyn Adapter>),
    ]
}
