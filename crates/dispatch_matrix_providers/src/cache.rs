use std::{
    hash::{Hash, Hasher},
    io::{BufWriter, Write},
    path::PathBuf,
};

use fxhash::FxHasher64;

use crate::{travel_matrices::TravelMatrices, travel_matrix_provider::TravelMatrixProvider};

pub trait MatricesCache {
    fn get(
        &self,
        points: &[geo_types::Point],
        provider: &TravelMatrixProvider,
    ) -> anyhow::Result<Option<TravelMatrices>>;

    fn put(
        &self,
        points: &[geo_types::Point],
        provider: &TravelMatrixProvider,
        matrices: &TravelMatrices,
    ) -> anyhow::Result<()>;
}

fn hash_points<H: Hasher>(points: &[geo_types::Point], hasher: &mut H) {
    points.len().hash(hasher);
    for point in points {
        hasher.write_u64(point.x().to_bits());
        hasher.write_u64(point.y().to_bits());
    }
}

fn cache_key(points: &[geo_types::Point], provider: &TravelMatrixProvider) -> u64 {
    let mut hasher = FxHasher64::default();

    hash_points(points, &mut hasher);
    provider.hash(&mut hasher);

    hasher.finish()
}

/// Stores matrices as JSON files named after the hash of points and provider
pub struct FileCache {
    folder: PathBuf,
}

impl FileCache {
    pub fn new(folder: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let folder = folder.into();

        if !folder.is_dir() {
            return Err(anyhow::anyhow!(
                "Path {} is not a directory",
                folder.display()
            ));
        }

        Ok(Self { folder })
    }

    fn file_path(&self, points: &[geo_types::Point], provider: &TravelMatrixProvider) -> PathBuf {
        self.folder
            .join(format!("{:016x}.json", cache_key(points, provider)))
    }
}

impl MatricesCache for FileCache {
    fn get(
        &self,
        points: &[geo_types::Point],
        provider: &TravelMatrixProvider,
    ) -> anyhow::Result<Option<TravelMatrices>> {
        let file_path = self.file_path(points, provider);

        if !file_path.is_file() {
            return Ok(None);
        }

        let file = std::fs::File::open(file_path)?;
        let matrices: TravelMatrices = serde_json::from_reader(file)?;

        Ok(Some(matrices))
    }

    fn put(
        &self,
        points: &[geo_types::Point],
        provider: &TravelMatrixProvider,
        matrices: &TravelMatrices,
    ) -> anyhow::Result<()> {
        let file = std::fs::File::create(self.file_path(points, provider))?;
        let mut writer = BufWriter::with_capacity(64 * 1024, file);
        serde_json::to_writer(&mut writer, matrices)?;
        writer.flush()?;

        Ok(())
    }
}

pub struct NoCache;

impl MatricesCache for NoCache {
    fn get(
        &self,
        _points: &[geo_types::Point],
        _provider: &TravelMatrixProvider,
    ) -> anyhow::Result<Option<TravelMatrices>> {
        Ok(None)
    }

    fn put(
        &self,
        _points: &[geo_types::Point],
        _provider: &TravelMatrixProvider,
        _matrices: &TravelMatrices,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}
