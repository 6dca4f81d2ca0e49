use numpy::{
    PyArray1, PyArrayDescrMethods, PyArrayMethods, PyUntypedArray, PyUntypedArrayMethods,
};
use pyo3::prelude::*;

use vslam_image::codec::{self, ArrayRef};
use vslam_image::{AnyImage, ImageError};

/// Decode a numpy array into an image, copying the pixels once.
pub fn image_from_pyarray(obj: &Bound<'_, PyAny>) -> Result<AnyImage, ImageError> {
    let array = obj.downcast::<PyUntypedArray>().map_err(|_| {
        let kind = obj
            .get_type()
            .name()
            .map(|n| n.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        ImageError::InvalidInputKind(format!("expected a numpy array, got {kind}"))
    })?;

    let descr = array.dtype();
    let typestr = format!(
        "{}{}{}",
        descr.byteorder() as char,
        descr.kind() as char,
        descr.itemsize()
    );
    let shape = array.shape();
    let strides = array.strides();

    let span = codec::byte_span(shape, strides, descr.itemsize()).ok_or_else(|| {
        ImageError::InvalidInputKind(format!(
            "layout {shape:?} with strides {strides:?} overflows the address space"
        ))
    })?;

    // SAFETY: the array object is borrowed for the whole call and the GIL is
    // held, so its buffer stays alive and unmodified while the codec copies
    // out of it. numpy addresses exactly `span.len` bytes starting `span.offset`
    // bytes below the first element.
    let data = unsafe {
        let first = (*array.as_array_ptr()).data as *const u8;
        if span.len == 0 || first.is_null() {
            &[][..]
        } else {
            std::slice::from_raw_parts(first.sub(span.offset), span.len)
        }
    };

    codec::decode(&ArrayRef {
        data,
        shape,
        strides: Some(strides),
        typestr: &typestr,
    })
}

/// Encode an image as a C-contiguous numpy array of the same element type.
pub fn image_to_pyarray<'py>(
    py: Python<'py>,
    image: &AnyImage,
) -> PyResult<Bound<'py, PyAny>> {
    let owned = codec::encode(image);
    let bytes = PyArray1::from_vec(py, owned.data);
    bytes
        .call_method1("view", (owned.dtype.typestr(),))?
        .call_method1("reshape", (owned.shape,))
}

/// A `rows x cols` float32 array from row-major values.
pub fn matrix_to_pyarray<'py>(
    py: Python<'py>,
    values: Vec<f32>,
    cols: usize,
) -> PyResult<Bound<'py, PyAny>> {
    let rows = if cols == 0 { 0 } else { values.len() / cols };
    Ok(PyArray1::from_vec(py, values)
        .reshape([rows, cols])?
        .into_any())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{eval, namespace, with_python};
    use pyo3::exceptions::PyValueError;
    use pyo3::ffi::c_str;
    use vslam_image::{Image, ImageSize};

    fn decoded(obj: &Bound<'_, PyAny>) -> PyResult<AnyImage> {
        image_from_pyarray(obj).map_err(|e| PyValueError::new_err(e.to_string()))
    }

    #[test]
    fn views_decode_like_their_contiguous_copies() -> PyResult<()> {
        with_python(|py| -> PyResult<()> {
            let g = namespace(py)?;
            let a = eval(&g, c_str!("np.arange(24, dtype=np.uint8).reshape(2, 4, 3)"))?;
            g.set_item("a", a)?;

            let views = [
                c_str!("a"),
                c_str!("a[..., ::-1]"),
                c_str!("a[::-1]"),
                c_str!("a[:, ::2]"),
                c_str!("a[::-1, ::-2, 1]"),
                c_str!("a.transpose(1, 0, 2)"),
            ];
            for view in views {
                let view = eval(&g, view)?;
                let copy = g
                    .get_item("np")?
                    .ok_or_else(|| PyValueError::new_err("numpy missing"))?
                    .call_method1("ascontiguousarray", (&view,))?;
                assert_eq!(decoded(&view)?, decoded(&copy)?);
            }

            let AnyImage::U8(rgb) = decoded(&eval(&g, c_str!("a[..., ::-1]"))?)? else {
                panic!("expected a u8 image");
            };
            assert_eq!(rgb.num_channels(), 3);
            assert_eq!(&rgb.as_slice()[..6], &[2, 1, 0, 5, 4, 3]);
            Ok(())
        })
    }

    #[test]
    fn element_types_follow_the_array() -> PyResult<()> {
        with_python(|py| -> PyResult<()> {
            let g = namespace(py)?;
            let depth = decoded(&eval(&g, c_str!("np.full((2, 3), 1000, dtype=np.uint16)"))?)?;
            assert!(matches!(depth, AnyImage::U16(_)));
            assert_eq!(depth.shape(), [2, 3, 1]);

            let depth = decoded(&eval(&g, c_str!("np.ones((4, 4), dtype=np.float32)"))?)?;
            assert!(matches!(depth, AnyImage::F32(_)));
            let depth = decoded(&eval(&g, c_str!("np.ones((4, 4), dtype=np.float64)"))?)?;
            assert!(matches!(depth, AnyImage::F64(_)));
            Ok(())
        })
    }

    #[test]
    fn incompatible_objects_are_rejected() -> PyResult<()> {
        with_python(|py| -> PyResult<()> {
            let g = namespace(py)?;
            let rejected = [
                c_str!("[[1, 2], [3, 4]]"),
                c_str!("np.zeros(8, dtype=np.uint8)"),
                c_str!("np.zeros((2, 2, 2, 2), dtype=np.uint8)"),
                c_str!("np.zeros((2, 2), dtype=np.complex64)"),
                c_str!("np.zeros((2, 2), dtype=np.dtype(np.uint16).newbyteorder('S'))"),
            ];
            for code in rejected {
                let obj = eval(&g, code)?;
                assert!(
                    matches!(image_from_pyarray(&obj), Err(ImageError::InvalidInputKind(_))),
                    "{code:?}"
                );
            }
            Ok(())
        })
    }

    #[test]
    fn encoded_images_come_back_unchanged() -> PyResult<()> {
        with_python(|py| -> PyResult<()> {
            let depth: AnyImage = Image::<u16>::new(
                ImageSize {
                    width: 3,
                    height: 2,
                },
                1,
                vec![0, 1, 2, 3, 4, u16::MAX],
            )
            .map_err(|e| PyValueError::new_err(e.to_string()))?
            .into();

            let array = image_to_pyarray(py, &depth)?;
            let shape: Vec<usize> = array.getattr("shape")?.extract()?;
            assert_eq!(shape, vec![2, 3]);
            let dtype: String = array.getattr("dtype")?.getattr("name")?.extract()?;
            assert_eq!(dtype, "uint16");
            assert_eq!(decoded(&array)?, depth);

            let matrix = matrix_to_pyarray(py, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3)?;
            let rows: Vec<Vec<f32>> = matrix.call_method0("tolist")?.extract()?;
            assert_eq!(rows, vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
            Ok(())
        })
    }
}
