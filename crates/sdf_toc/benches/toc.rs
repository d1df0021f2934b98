use divan::AllocProfiler;

#[global_allocator]
static ALLOC: AllocProfiler = AllocProfiler::system();

#[path = "../tests/common/mod.rs"]
mod common;

fn main() {
    divan::main();
}

pub mod tree {
    use divan::Bencher;
    use sdf_toc::{Block, SdfToc};

    use crate::common::{pattern, ArchiveBuilder, FileEntry};

    fn get_input(files: usize) -> Vec<u8> {
        let mut builder = ArchiveBuilder::new().header(b"DDS ");
        for i in 0..files {
            let name = format!("textures/{:04}/diffuse.dds", i);
            let file = FileEntry::new(&name, 1, &pattern(64, i as u8)).with_chunk(b"tail");
            builder = builder.file(if i % 3 == 0 { file.with_header(0) } else { file });
        }
        builder.build().unwrap().index
    }

    #[divan::bench(args = [10, 100, 1000])]
    fn open(bencher: Bencher, files: usize) {
        bencher
            .with_inputs(|| get_input(files))
            .bench_values(|data| {
                divan::black_box(SdfToc::new(Block::from_vec(data)).unwrap());
            });
    }

    #[divan::bench(args = [10, 100, 1000])]
    fn decode(bencher: Bencher, files: usize) {
        let toc = SdfToc::new(Block::from_vec(get_input(files))).unwrap();
        bencher.bench_local(move || {
            let mut count = 0usize;
            toc.for_each_chunk(|chunk| {
                count += divan::black_box(chunk).decompressed_size as usize;
                Ok(())
            })
            .unwrap();
            count
        });
    }
}

pub mod compression {
    use divan::Bencher;
    use sdf_toc::{compression::reconstruct, Block};

    use crate::common::{compress, pattern, PAGE_SIZE};

    fn get_input(pages: usize) -> (Block, Vec<u64>) {
        let mut package = Vec::new();
        let mut page_sizes = Vec::new();
        for page in 0..pages {
            let compressed = compress(&pattern(PAGE_SIZE, page as u8)).unwrap();
            page_sizes.push(compressed.len() as u64);
            package.extend(compressed);
        }
        (Block::from_vec(package), page_sizes)
    }

    #[divan::bench(args = [1, 8, 32])]
    fn reconstruct_pages(bencher: Bencher, pages: usize) {
        let (package, page_sizes) = get_input(pages);
        let size = (pages * PAGE_SIZE) as u64;

        bencher.bench_local(move || {
            divan::black_box(reconstruct(&package, 0, size, &page_sizes).unwrap());
        });
    }

    #[divan::bench]
    fn reconstruct_raw(bencher: Bencher) {
        let package = Block::from_vec(pattern(PAGE_SIZE * 4, 1));

        bencher.bench_local(move || {
            divan::black_box(
                reconstruct(&package, 0, PAGE_SIZE as u64 * 4, &[0, 0, 0, 0])
                    .unwrap()
                    .to_vec()
                    .unwrap(),
            );
        });
    }
}
