//! Synthetic DICOM files for the integration tests.
#![allow(dead_code)]
use std::path::Path;

use dicom_core::{DataElement, PrimitiveValue, Tag, VR};
use dicom_dictionary_std::{tags, uids};
use dicom_object::mem::InMemElement;
use dicom_object::{FileMetaTableBuilder, InMemDicomObject};
use dicom_transfer_syntax_registry::entries::IMPLICIT_VR_LITTLE_ENDIAN;

const SECONDARY_CAPTURE: &str = "1.2.840.10008.5.1.4.1.1.7";

fn us(tag: Tag, value: u16) -> InMemElement {
    DataElement::new(tag, VR::US, PrimitiveValue::from(value))
}

fn save(mut obj: InMemDicomObject, path: &Path) {
    let sop_instance_uid = "2.25.98765432101234567890";
    obj.put(DataElement::new(
        tags::SOP_CLASS_UID,
        VR::UI,
        PrimitiveValue::from(SECONDARY_CAPTURE),
    ));
    obj.put(DataElement::new(
        tags::SOP_INSTANCE_UID,
        VR::UI,
        PrimitiveValue::from(sop_instance_uid),
    ));
    obj.put(DataElement::new(
        tags::PATIENT_NAME,
        VR::PN,
        PrimitiveValue::from("Doe^John"),
    ));

    let file = obj
        .with_meta(
            FileMetaTableBuilder::new()
                .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN)
                .media_storage_sop_class_uid(SECONDARY_CAPTURE)
                .media_storage_sop_instance_uid(sop_instance_uid),
        )
        .unwrap();

    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    file.write_to_file(path).unwrap();
}

fn image_module(
    rows: u16,
    columns: u16,
    samples_per_pixel: u16,
    photometric_interpretation: &str,
    bits: u16,
    pixel_representation: u16,
) -> InMemDicomObject {
    let mut obj = InMemDicomObject::new_empty();
    obj.put(us(tags::SAMPLES_PER_PIXEL, samples_per_pixel));
    obj.put(DataElement::new(
        tags::PHOTOMETRIC_INTERPRETATION,
        VR::CS,
        PrimitiveValue::from(photometric_interpretation),
    ));
    if samples_per_pixel > 1 {
        obj.put(us(tags::PLANAR_CONFIGURATION, 0));
    }
    obj.put(us(tags::ROWS, rows));
    obj.put(us(tags::COLUMNS, columns));
    obj.put(us(tags::BITS_ALLOCATED, bits));
    obj.put(us(tags::BITS_STORED, bits));
    obj.put(us(tags::HIGH_BIT, bits - 1));
    obj.put(us(tags::PIXEL_REPRESENTATION, pixel_representation));
    obj
}

/// Write an 8-bit MONOCHROME2 image.
pub fn write_gray8(path: &Path, rows: u16, columns: u16, pixels: Vec<u8>) {
    assert_eq!(pixels.len(), rows as usize * columns as usize);
    let mut obj = image_module(rows, columns, 1, "MONOCHROME2", 8, 0);
    obj.put(DataElement::new(
        tags::PIXEL_DATA,
        VR::OB,
        PrimitiveValue::from(pixels),
    ));
    save(obj, path);
}

/// Write a signed 16-bit MONOCHROME2 image.
pub fn write_gray16_signed(path: &Path, rows: u16, columns: u16, pixels: Vec<i16>) {
    assert_eq!(pixels.len(), rows as usize * columns as usize);
    let mut obj = image_module(rows, columns, 1, "MONOCHROME2", 16, 1);
    obj.put(DataElement::new(
        tags::PIXEL_DATA,
        VR::OW,
        PrimitiveValue::I16(pixels.into()),
    ));
    save(obj, path);
}

/// Write an 8-bit RGB image filled with a single color.
pub fn write_rgb8(path: &Path, rows: u16, columns: u16) {
    let mut obj = image_module(rows, columns, 3, "RGB", 8, 0);
    let pixels: Vec<u8> = (0..rows as usize * columns as usize)
        .flat_map(|_| [200, 100, 50])
        .collect();
    obj.put(DataElement::new(
        tags::PIXEL_DATA,
        VR::OB,
        PrimitiveValue::from(pixels),
    ));
    save(obj, path);
}

/// Write an 8-bit MONOCHROME2 image as a bare data set in implicit VR
/// little endian, with neither preamble nor file meta group.
pub fn write_gray8_bare(path: &Path, rows: u16, columns: u16, pixels: Vec<u8>) {
    assert_eq!(pixels.len(), rows as usize * columns as usize);
    let mut obj = image_module(rows, columns, 1, "MONOCHROME2", 8, 0);
    obj.put(DataElement::new(
        tags::SOP_CLASS_UID,
        VR::UI,
        PrimitiveValue::from(SECONDARY_CAPTURE),
    ));
    obj.put(DataElement::new(
        tags::PIXEL_DATA,
        VR::OB,
        PrimitiveValue::from(pixels),
    ));

    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let file = std::fs::File::create(path).unwrap();
    obj.write_dataset_with_ts(file, &IMPLICIT_VR_LITTLE_ENDIAN.erased())
        .unwrap();
}

/// Write a DICOM file without pixel data (e.g. a structured report).
pub fn write_without_pixel_data(path: &Path) {
    let mut obj = InMemDicomObject::new_empty();
    obj.put(DataElement::new(
        tags::MODALITY,
        VR::CS,
        PrimitiveValue::from("SR"),
    ));
    save(obj, path);
}

/// A horizontal gradient covering the whole 8-bit range.
pub fn gradient8(rows: u16, columns: u16) -> Vec<u8> {
    (0..rows as usize)
        .flat_map(|_| (0..columns as usize).map(move |x| (x * 255 / (columns as usize - 1)) as u8))
        .collect()
}
