//! Local bundle directory origin.
//!
//! Layout: `<root>/<product>/<version>/<component>/messages_<locale>.json`,
//! file names matched case-insensitively. Each file holds
//! `{"component": .., "locale": .., "messages": {..}}`.
//!
//! Product, version, component and locale must each be a single plain path
//! component, so lookups never leave the bundle root.

use std::collections::{BTreeSet, HashMap};
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use sgtn_core::{ComponentMessages, Error, ItemId, ItemKind, Payload};

const BUNDLE_PREFIX: &str = "messages_";
const BUNDLE_SUFFIX: &str = ".json";

#[derive(Debug, Deserialize)]
struct BundleFile {
    #[serde(default)]
    messages: HashMap<String, String>,
}

/// Origin reading bundles from a directory tree.
#[derive(Debug, Clone)]
pub struct BundleOrigin {
    root: PathBuf,
}

impl BundleOrigin {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn get(&self, id: &ItemId) -> Result<Payload, Error> {
        match id.kind {
            ItemKind::ComponentMessages => self
                .component_messages(&id.product, &id.version, &id.locale, &id.component)
                .await
                .map(Payload::from),
            ItemKind::LocaleList => self.locale_list(&id.product, &id.version).await.map(Payload::from),
            ItemKind::ComponentList => self.component_list(&id.product, &id.version).await.map(Payload::from),
        }
    }

    /// Immediate subdirectories of `<root>/<product>/<version>`, sorted.
    pub async fn component_list(&self, product: &str, version: &str) -> Result<Vec<String>, Error> {
        let dir = self.root.join(segment("product", product)?).join(segment("version", version)?);
        let mut components: Vec<String> = read_dir(&dir)
            .await?
            .into_iter()
            .filter(|entry| entry.is_dir)
            .map(|entry| entry.name)
            .collect();
        components.sort();
        Ok(components)
    }

    /// Locales of every bundle file across all components, lower-cased and deduplicated.
    pub async fn locale_list(&self, product: &str, version: &str) -> Result<Vec<String>, Error> {
        let mut locales = BTreeSet::new();
        let version_dir = self.root.join(segment("product", product)?).join(segment("version", version)?);
        for component in self.component_list(product, version).await? {
            let dir = version_dir.join(&component);
            for entry in read_dir(&dir).await? {
                if !entry.is_dir
                    && let Some(locale) = locale_of(&entry.name)
                {
                    locales.insert(locale);
                }
            }
        }
        Ok(locales.into_iter().collect())
    }

    pub async fn component_messages(
        &self, product: &str, version: &str, locale: &str, component: &str,
    ) -> Result<ComponentMessages, Error> {
        let dir = self
            .root
            .join(segment("product", product)?)
            .join(segment("version", version)?)
            .join(segment("component", component)?);
        let wanted = format!("{BUNDLE_PREFIX}{}{BUNDLE_SUFFIX}", segment("locale", locale)?);
        let file_name = read_dir(&dir)
            .await?
            .into_iter()
            .find(|entry| !entry.is_dir && entry.name.eq_ignore_ascii_case(&wanted))
            .map(|entry| entry.name)
            .unwrap_or(wanted);

        let path = dir.join(file_name);
        let contents = tokio::fs::read(&path).await.map_err(|e| Error::filesystem(&path, e))?;
        let bundle: BundleFile = serde_json::from_slice(&contents)
            .map_err(|e| Error::WrongLocalData(format!("{}: {e}", path.display())))?;
        if bundle.messages.is_empty() {
            return Err(Error::WrongLocalData(format!("{}: no messages", path.display())));
        }

        tracing::debug!(path = %path.display(), messages = bundle.messages.len(), "loaded local bundle");
        Ok(ComponentMessages::new(bundle.messages))
    }
}

/// `value` if it names exactly one normal path component.
fn segment<'a>(field: &str, value: &'a str) -> Result<&'a str, Error> {
    let mut components = Path::new(value).components();
    let single = matches!((components.next(), components.next()), (Some(Component::Normal(_)), None));
    if single && !value.contains(['/', '\\']) {
        Ok(value)
    } else {
        Err(Error::InvalidParameters(format!("{field} {value:?} is not a plain path component")))
    }
}

struct DirEntry {
    name: String,
    is_dir: bool,
}

async fn read_dir(dir: &Path) -> Result<Vec<DirEntry>, Error> {
    let mut reader = tokio::fs::read_dir(dir).await.map_err(|e| Error::filesystem(dir, e))?;
    let mut entries = Vec::new();
    while let Some(entry) = reader.next_entry().await.map_err(|e| Error::filesystem(dir, e))? {
        let is_dir = entry
            .file_type()
            .await
            .map_err(|e| Error::filesystem(entry.path(), e))?
            .is_dir();
        entries.push(DirEntry { name: entry.file_name().to_string_lossy().into_owned(), is_dir });
    }
    Ok(entries)
}

/// `messages_fr.json` -> `fr`. Case-insensitive; the token is lower-cased.
fn locale_of(file_name: &str) -> Option<String> {
    let lower = file_name.to_lowercase();
    lower
        .strip_prefix(BUNDLE_PREFIX)
        .and_then(|rest| rest.strip_suffix(BUNDLE_SUFFIX))
        .filter(|locale| !locale.is_empty())
        .map(str::to_string)
}
